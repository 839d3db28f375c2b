//! Action scheduler — the countdown safety state machine.
//!
//! Purely tick-driven: the owner calls [`ActionScheduler::tick`] once per
//! second and the machine advances on elapsed ticks alone, without timers.
//! The wrapped action is taken out of the scheduler the moment it runs or
//! is cancelled, so it can execute at most once per `schedule()`.

use std::sync::Arc;

use idlewatch_domain::error::{ActionError, SchedulerError};
use idlewatch_domain::scheduler::{SchedulerEvent, SchedulerState};

use crate::ports::SystemAction;

/// Sequences "condition met" → pre-warning → countdown → execution.
pub struct ActionScheduler {
    state: SchedulerState,
    pre_warning_secs: u64,
    countdown_secs: u64,
    /// Ticks spent in the current phase.
    elapsed_secs: u64,
    action: Option<Arc<dyn SystemAction>>,
    events: Vec<SchedulerEvent>,
}

impl ActionScheduler {
    #[must_use]
    pub fn new(pre_warning_secs: u64, countdown_secs: u64) -> Self {
        Self {
            state: SchedulerState::Idle,
            pre_warning_secs,
            countdown_secs,
            elapsed_secs: 0,
            action: None,
            events: Vec::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Seconds until the action runs, while one is in flight.
    #[must_use]
    pub fn remaining(&self) -> Option<u64> {
        match self.state {
            SchedulerState::Pending => Some(
                self.pre_warning_secs
                    .saturating_sub(self.elapsed_secs)
                    .saturating_add(self.countdown_secs),
            ),
            SchedulerState::Countdown => Some(self.countdown_secs.saturating_sub(self.elapsed_secs)),
            _ => None,
        }
    }

    /// Drain the events emitted since the last call.
    pub fn take_events(&mut self) -> Vec<SchedulerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Arm `action`. Idle → Pending.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidTransition`] while another action is
    /// pending or counting down; the existing schedule is left untouched.
    pub fn schedule(&mut self, action: Arc<dyn SystemAction>) -> Result<(), SchedulerError> {
        if self.state.is_in_flight() {
            return Err(self.invalid("schedule"));
        }
        tracing::info!(action = action.id(), pre_warning = self.pre_warning_secs, "action scheduled");
        self.state = SchedulerState::Pending;
        self.elapsed_secs = 0;
        self.action = Some(action);
        self.events.push(SchedulerEvent::PreWarning {
            seconds_until_countdown: self.pre_warning_secs,
        });
        Ok(())
    }

    /// Advance one second.
    ///
    /// No-op outside Pending and Countdown.
    ///
    /// # Errors
    ///
    /// Returns the [`ActionError`] when the action ran on this tick and
    /// failed; the scheduler is then [`SchedulerState::Failed`].
    pub fn tick(&mut self) -> Result<(), ActionError> {
        match self.state {
            SchedulerState::Pending => {
                self.elapsed_secs += 1;
                if self.elapsed_secs >= self.pre_warning_secs {
                    self.enter_countdown()?;
                }
                Ok(())
            }
            SchedulerState::Countdown => {
                self.elapsed_secs += 1;
                let remaining = self.countdown_secs.saturating_sub(self.elapsed_secs);
                self.events.push(SchedulerEvent::CountdownTick {
                    remaining_seconds: remaining,
                });
                if remaining == 0 {
                    return self.fire();
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Abort the scheduled action. Pending/Countdown → Cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidTransition`] when nothing is in flight.
    pub fn cancel(&mut self) -> Result<(), SchedulerError> {
        if !self.state.is_in_flight() {
            return Err(self.invalid("cancel"));
        }
        self.action = None;
        self.state = SchedulerState::Cancelled;
        self.elapsed_secs = 0;
        self.events.push(SchedulerEvent::Cancelled);
        tracing::info!("scheduled action cancelled");
        Ok(())
    }

    /// Skip the remaining wait and run the action now.
    ///
    /// # Errors
    ///
    /// Returns [`ExecuteNowError::Scheduler`] when nothing is in flight, or
    /// [`ExecuteNowError::Action`] when the action ran and failed.
    pub fn execute_now(&mut self) -> Result<(), ExecuteNowError> {
        if !self.state.is_in_flight() {
            return Err(self.invalid("execute now").into());
        }
        tracing::info!(state = %self.state, "executing action ahead of countdown");
        Ok(self.fire()?)
    }

    /// Back to Idle from any state, dropping any armed action.
    pub fn reset(&mut self) {
        self.state = SchedulerState::Idle;
        self.elapsed_secs = 0;
        self.action = None;
        self.events.clear();
    }

    fn enter_countdown(&mut self) -> Result<(), ActionError> {
        self.state = SchedulerState::Countdown;
        self.elapsed_secs = 0;
        self.events.push(SchedulerEvent::CountdownStarted {
            total_seconds: self.countdown_secs,
        });
        if self.countdown_secs == 0 {
            return self.fire();
        }
        Ok(())
    }

    fn fire(&mut self) -> Result<(), ActionError> {
        self.elapsed_secs = 0;
        let Some(action) = self.action.take() else {
            self.state = SchedulerState::Failed;
            let reason = "no action was armed".to_string();
            self.events.push(SchedulerEvent::Failed {
                reason: reason.clone(),
            });
            return Err(ActionError::Unknown(reason));
        };

        match action.execute() {
            Ok(()) => {
                tracing::info!(action = action.id(), "action executed");
                self.state = SchedulerState::Executed;
                self.events.push(SchedulerEvent::Executed);
                Ok(())
            }
            Err(err) => {
                tracing::error!(action = action.id(), error = %err, "action failed");
                self.state = SchedulerState::Failed;
                self.events.push(SchedulerEvent::Failed {
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    fn invalid(&self, operation: &'static str) -> SchedulerError {
        SchedulerError::InvalidTransition {
            operation,
            state: self.state,
        }
    }
}

/// Why [`ActionScheduler::execute_now`] did not complete.
#[derive(Debug, thiserror::Error)]
pub enum ExecuteNowError {
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Action(#[from] ActionError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeAction;

    fn armed(pre: u64, countdown: u64) -> (ActionScheduler, FakeAction) {
        let action = FakeAction::new("shutdown");
        let mut scheduler = ActionScheduler::new(pre, countdown);
        scheduler.schedule(Arc::new(action.clone())).unwrap();
        (scheduler, action)
    }

    fn tick_n(scheduler: &mut ActionScheduler, n: u64) {
        for _ in 0..n {
            scheduler.tick().unwrap();
        }
    }

    #[test]
    fn should_walk_pending_countdown_then_cancel() {
        let (mut scheduler, action) = armed(60, 30);

        tick_n(&mut scheduler, 59);
        assert_eq!(scheduler.state(), SchedulerState::Pending);

        scheduler.tick().unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Countdown);
        assert_eq!(scheduler.remaining(), Some(30));

        scheduler.cancel().unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Cancelled);
        tick_n(&mut scheduler, 100);
        assert_eq!(action.executions(), 0);
    }

    #[test]
    fn should_execute_once_when_countdown_reaches_zero() {
        let (mut scheduler, action) = armed(2, 3);
        tick_n(&mut scheduler, 4);
        assert_eq!(scheduler.state(), SchedulerState::Countdown);
        assert_eq!(scheduler.remaining(), Some(1));

        scheduler.tick().unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Executed);
        tick_n(&mut scheduler, 10);
        assert_eq!(action.executions(), 1);
    }

    #[test]
    fn should_emit_events_in_transition_order() {
        let (mut scheduler, _) = armed(1, 2);
        tick_n(&mut scheduler, 3);
        assert_eq!(
            scheduler.take_events(),
            [
                SchedulerEvent::PreWarning {
                    seconds_until_countdown: 1
                },
                SchedulerEvent::CountdownStarted { total_seconds: 2 },
                SchedulerEvent::CountdownTick {
                    remaining_seconds: 1
                },
                SchedulerEvent::CountdownTick {
                    remaining_seconds: 0
                },
                SchedulerEvent::Executed,
            ]
        );
        assert!(scheduler.take_events().is_empty());
    }

    #[test]
    fn should_reject_second_schedule_while_in_flight() {
        let (mut scheduler, first) = armed(10, 10);
        tick_n(&mut scheduler, 3);
        let second = FakeAction::new("lock");

        let err = scheduler.schedule(Arc::new(second.clone())).unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::InvalidTransition {
                operation: "schedule",
                state: SchedulerState::Pending
            }
        ));
        assert_eq!(scheduler.remaining(), Some(17));

        scheduler.execute_now().unwrap();
        assert_eq!(first.executions(), 1);
        assert_eq!(second.executions(), 0);
    }

    #[test]
    fn should_never_execute_when_cancelled_at_any_tick() {
        for n in 0..5 {
            let (mut scheduler, action) = armed(0, 5);
            tick_n(&mut scheduler, n);
            scheduler.cancel().unwrap();
            tick_n(&mut scheduler, 10);
            assert_eq!(action.executions(), 0, "cancelled at tick {n}");
        }
    }

    #[test]
    fn should_execute_exactly_once_on_execute_now() {
        let (mut scheduler, action) = armed(60, 30);
        tick_n(&mut scheduler, 61);
        scheduler.execute_now().unwrap();
        assert!(scheduler.execute_now().is_err());
        tick_n(&mut scheduler, 60);
        assert_eq!(action.executions(), 1);
        assert_eq!(scheduler.state(), SchedulerState::Executed);
    }

    #[test]
    fn should_report_error_for_cancel_and_execute_now_when_idle() {
        let mut scheduler = ActionScheduler::new(5, 5);
        assert!(matches!(
            scheduler.cancel(),
            Err(SchedulerError::InvalidTransition { operation: "cancel", .. })
        ));
        assert!(matches!(
            scheduler.execute_now(),
            Err(ExecuteNowError::Scheduler(_))
        ));
    }

    #[test]
    fn should_report_error_for_cancel_after_cancel() {
        let (mut scheduler, _) = armed(5, 5);
        scheduler.cancel().unwrap();
        let err = scheduler.cancel().unwrap_err();
        assert_eq!(err.to_string(), "cannot cancel while scheduler is cancelled");
    }

    #[test]
    fn should_enter_countdown_on_first_tick_without_pre_warning() {
        let (mut scheduler, _) = armed(0, 10);
        scheduler.tick().unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Countdown);
        assert_eq!(scheduler.remaining(), Some(10));
    }

    #[test]
    fn should_execute_on_countdown_entry_when_countdown_is_zero() {
        let (mut scheduler, action) = armed(2, 0);
        tick_n(&mut scheduler, 2);
        assert_eq!(scheduler.state(), SchedulerState::Executed);
        assert_eq!(action.executions(), 1);
    }

    #[test]
    fn should_move_to_failed_when_action_errors() {
        let action = FakeAction::new("hibernate").failing();
        let mut scheduler = ActionScheduler::new(0, 1);
        scheduler.schedule(Arc::new(action.clone())).unwrap();
        scheduler.tick().unwrap();

        let err = scheduler.tick().unwrap_err();
        assert!(matches!(err, ActionError::Failed { code: 1, .. }));
        assert_eq!(scheduler.state(), SchedulerState::Failed);
        assert!(matches!(
            scheduler.take_events().last(),
            Some(SchedulerEvent::Failed { .. })
        ));
        assert_eq!(action.executions(), 1);
    }

    #[test]
    fn should_allow_rescheduling_after_terminal_state() {
        let (mut scheduler, _) = armed(5, 5);
        scheduler.cancel().unwrap();
        let again = FakeAction::new("lock");
        scheduler.schedule(Arc::new(again)).unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Pending);
    }

    #[test]
    fn should_drop_armed_action_on_reset() {
        let (mut scheduler, action) = armed(0, 1);
        scheduler.reset();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        tick_n(&mut scheduler, 5);
        assert_eq!(action.executions(), 0);
    }
}
