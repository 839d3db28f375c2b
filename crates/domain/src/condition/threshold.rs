//! Threshold condition — "value has stayed below X for Y seconds".
//!
//! The streak is anchored at the first sub-threshold reading and measured
//! with reading timestamps. Any reading at or above the threshold clears
//! the anchor, so `Met` is only ever reported for an unbroken streak.

use serde::{Deserialize, Serialize};

use super::{Condition, ConditionResult};
use crate::error::ConditionError;
use crate::reading::{Reading, fields};
use crate::time::{Timestamp, elapsed_secs};

/// Which traffic direction(s) the threshold applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorMode {
    #[default]
    DownloadOnly,
    UploadOnly,
    /// Both directions must be below the threshold.
    #[serde(alias = "both")]
    Combined,
}

/// Sustained below-threshold detector.
#[derive(Debug, Clone)]
pub struct ThresholdCondition {
    threshold_bytes_per_sec: u64,
    required_duration_secs: u64,
    monitor_mode: MonitorMode,
    below_since: Option<Timestamp>,
    /// Set once `Met` was reported for the current streak.
    fired: bool,
}

impl ThresholdCondition {
    #[must_use]
    pub fn new(
        threshold_bytes_per_sec: u64,
        required_duration_secs: u64,
        monitor_mode: MonitorMode,
    ) -> Self {
        Self {
            threshold_bytes_per_sec,
            required_duration_secs,
            monitor_mode,
            below_since: None,
            fired: false,
        }
    }

    #[must_use]
    pub fn threshold_bytes_per_sec(&self) -> u64 {
        self.threshold_bytes_per_sec
    }

    #[must_use]
    pub fn required_duration_secs(&self) -> u64 {
        self.required_duration_secs
    }

    #[must_use]
    pub fn monitor_mode(&self) -> MonitorMode {
        self.monitor_mode
    }

    fn is_below(&self, reading: &Reading) -> Result<bool, ConditionError> {
        let limit = self.threshold_bytes_per_sec;
        Ok(match self.monitor_mode {
            MonitorMode::DownloadOnly => reading.require_u64(fields::DOWNLOAD_BPS)? < limit,
            MonitorMode::UploadOnly => reading.require_u64(fields::UPLOAD_BPS)? < limit,
            MonitorMode::Combined => {
                reading.require_u64(fields::DOWNLOAD_BPS)? < limit
                    && reading.require_u64(fields::UPLOAD_BPS)? < limit
            }
        })
    }
}

impl Condition for ThresholdCondition {
    fn name(&self) -> &'static str {
        "threshold"
    }

    fn evaluate(&mut self, reading: &Reading) -> Result<ConditionResult, ConditionError> {
        if !self.is_below(reading)? {
            self.reset();
            return Ok(ConditionResult::Waiting);
        }

        let since = *self.below_since.get_or_insert(reading.taken_at);
        let elapsed = elapsed_secs(since, reading.taken_at);

        if elapsed >= self.required_duration_secs && !self.fired {
            self.fired = true;
            return Ok(ConditionResult::Met);
        }
        Ok(ConditionResult::InProgress {
            elapsed_secs: elapsed,
        })
    }

    fn reset(&mut self) {
        self.below_since = None;
        self.fired = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::now;
    use chrono::Duration;

    const KB: u64 = 1000;

    fn reading_at(t0: Timestamp, sec: i64, down: u64, up: u64) -> Reading {
        Reading::new(t0 + Duration::seconds(sec))
            .with(fields::DOWNLOAD_BPS, down)
            .with(fields::UPLOAD_BPS, up)
    }

    /// Feed one reading per second; return the seconds at which `Met` fired.
    fn run(condition: &mut ThresholdCondition, downloads: &[u64]) -> Vec<i64> {
        let t0 = now();
        downloads
            .iter()
            .zip(0_i64..)
            .filter_map(|(&down, sec)| {
                let result = condition.evaluate(&reading_at(t0, sec, down, 0)).unwrap();
                result.is_met().then_some(sec)
            })
            .collect()
    }

    #[test]
    fn should_fire_once_after_required_duration() {
        let mut condition = ThresholdCondition::new(200 * KB, 120, MonitorMode::DownloadOnly);
        let fired = run(&mut condition, &[50 * KB; 130]);
        assert_eq!(fired, [120]);
    }

    #[test]
    fn should_restart_streak_when_spike_interrupts() {
        let mut condition = ThresholdCondition::new(200 * KB, 120, MonitorMode::DownloadOnly);
        let mut downloads = vec![50 * KB; 260];
        downloads[100] = 500 * KB;
        let fired = run(&mut condition, &downloads);
        assert_eq!(fired, [221]);
    }

    #[test]
    fn should_never_fire_when_dips_are_shorter_than_duration() {
        let mut condition = ThresholdCondition::new(200 * KB, 30, MonitorMode::DownloadOnly);
        let downloads: Vec<u64> = (0..300)
            .map(|sec| if sec % 30 == 29 { 900 * KB } else { 10 * KB })
            .collect();
        assert!(run(&mut condition, &downloads).is_empty());
    }

    #[test]
    fn should_fire_again_only_after_recovery() {
        let mut condition = ThresholdCondition::new(200 * KB, 10, MonitorMode::DownloadOnly);
        let mut downloads = vec![10 * KB; 40];
        downloads[20] = 900 * KB;
        let fired = run(&mut condition, &downloads);
        assert_eq!(fired, [10, 31]);
    }

    #[test]
    fn should_report_in_progress_with_elapsed_seconds() {
        let mut condition = ThresholdCondition::new(200 * KB, 60, MonitorMode::DownloadOnly);
        let t0 = now();
        condition.evaluate(&reading_at(t0, 0, 0, 0)).unwrap();
        let result = condition.evaluate(&reading_at(t0, 7, 0, 0)).unwrap();
        assert_eq!(result, ConditionResult::InProgress { elapsed_secs: 7 });
    }

    #[test]
    fn should_treat_value_equal_to_threshold_as_not_below() {
        let mut condition = ThresholdCondition::new(200 * KB, 0, MonitorMode::DownloadOnly);
        let result = condition.evaluate(&reading_at(now(), 0, 200 * KB, 0)).unwrap();
        assert_eq!(result, ConditionResult::Waiting);
    }

    #[test]
    fn should_ignore_download_in_upload_only_mode() {
        let mut condition = ThresholdCondition::new(100, 0, MonitorMode::UploadOnly);
        let result = condition.evaluate(&reading_at(now(), 0, 10_000, 5)).unwrap();
        assert!(result.is_met());
    }

    #[test]
    fn should_require_both_directions_below_in_combined_mode() {
        let mut condition = ThresholdCondition::new(100, 0, MonitorMode::Combined);
        let t0 = now();
        let busy_upload = condition.evaluate(&reading_at(t0, 0, 5, 500)).unwrap();
        assert_eq!(busy_upload, ConditionResult::Waiting);
        let both_quiet = condition.evaluate(&reading_at(t0, 1, 5, 5)).unwrap();
        assert!(both_quiet.is_met());
    }

    #[test]
    fn should_accept_both_as_alias_for_combined() {
        let mode: MonitorMode = serde_json::from_str("\"both\"").unwrap();
        assert_eq!(mode, MonitorMode::Combined);
    }

    #[test]
    fn should_clear_streak_on_reset() {
        let mut condition = ThresholdCondition::new(100, 5, MonitorMode::DownloadOnly);
        let t0 = now();
        condition.evaluate(&reading_at(t0, 0, 0, 0)).unwrap();
        condition.reset();
        let result = condition.evaluate(&reading_at(t0, 10, 0, 0)).unwrap();
        assert_eq!(result, ConditionResult::InProgress { elapsed_secs: 0 });
    }

    #[test]
    fn should_error_when_monitored_field_missing() {
        let mut condition = ThresholdCondition::new(100, 5, MonitorMode::Combined);
        let reading = Reading::new(now()).with(fields::DOWNLOAD_BPS, 1_u64);
        assert!(matches!(
            condition.evaluate(&reading),
            Err(ConditionError::MissingField(key)) if key == "upload_bps"
        ));
    }
}
