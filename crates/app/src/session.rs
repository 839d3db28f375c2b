//! Monitoring session — one trigger, one condition, one scheduler.
//!
//! [`MonitorSession::step`] is the whole pipeline for one tick:
//!
//! 1. advance an in-flight action (pre-warning / countdown / execution);
//! 2. read the trigger;
//! 3. judge the reading with the condition;
//! 4. arm the action when the condition is met and nothing is in flight.
//!
//! Read and evaluation failures are counted; once `max_consecutive_failures`
//! happen in a row the session halts in [`SessionStatus::Errored`] until
//! [`MonitorSession::resume`]. A paused or errored session freezes the
//! scheduler as-is; only `cancel()` and `stop()` abort an armed action.

use std::sync::Arc;

use idlewatch_domain::activity::{LogEntry, LogStatus};
use idlewatch_domain::condition::{Condition, ConditionResult};
use idlewatch_domain::error::{SchedulerError, SessionError, Stage};
use idlewatch_domain::id::SessionId;
use idlewatch_domain::monitoring::MonitoringConfig;
use idlewatch_domain::reading::Reading;
use idlewatch_domain::scheduler::SchedulerState;
use idlewatch_domain::session::{SessionStatus, TickReport};
use idlewatch_domain::trigger::TriggerState;

use crate::ports::SystemAction;
use crate::scheduler::{ActionScheduler, ExecuteNowError};
use crate::trigger::Trigger;

/// State owned by the single active session.
pub struct MonitorSession<T> {
    id: SessionId,
    reason: String,
    trigger: T,
    condition: Box<dyn Condition>,
    scheduler: ActionScheduler,
    action: Arc<dyn SystemAction>,
    status: SessionStatus,
    consecutive_failures: u32,
    max_consecutive_failures: u32,
    last_condition: ConditionResult,
    last_error: Option<String>,
    pending_log: Vec<LogEntry>,
}

impl<T: Trigger> MonitorSession<T> {
    /// Assemble a session. The trigger is not started yet.
    pub fn new(
        config: &MonitoringConfig,
        trigger: T,
        action: Arc<dyn SystemAction>,
        max_consecutive_failures: u32,
    ) -> Self {
        Self {
            id: SessionId::new(),
            reason: config.trigger.reason(),
            trigger,
            condition: config.condition.build(),
            scheduler: ActionScheduler::new(config.pre_warning_seconds, config.countdown_seconds),
            action,
            status: SessionStatus::Monitoring,
            consecutive_failures: 0,
            max_consecutive_failures: max_consecutive_failures.max(1),
            last_condition: ConditionResult::Waiting,
            last_error: None,
            pending_log: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// Stage-prefixed description of the failure that errored the session.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Entries recorded since the last call, oldest first.
    pub fn take_log_entries(&mut self) -> Vec<LogEntry> {
        std::mem::take(&mut self.pending_log)
    }

    /// Start the trigger and record the session start.
    ///
    /// # Errors
    ///
    /// Propagates the trigger's start failure.
    pub async fn start(&mut self) -> Result<(), idlewatch_domain::error::TriggerError> {
        self.trigger.start().await?;
        self.record(LogStatus::Info, Some("monitoring started".to_string()));
        Ok(())
    }

    /// Run one tick of the pipeline.
    pub async fn step(&mut self) -> TickReport {
        let mut reading = None;

        if self.status == SessionStatus::Monitoring && self.scheduler.state().is_in_flight() {
            if let Err(err) = self.scheduler.tick() {
                self.fail(Stage::Executing, &err);
            }
            self.settle_scheduler();
        }

        if self.status == SessionStatus::Monitoring {
            reading = self.read_and_judge().await;
        }

        self.report(reading)
    }

    async fn read_and_judge(&mut self) -> Option<Reading> {
        let (state, reading) = match self.trigger.evaluate().await {
            Ok(result) => result,
            Err(err) => {
                self.count_failure(Stage::Reading, &err);
                return None;
            }
        };

        if state == TriggerState::Idle {
            self.consecutive_failures = 0;
            return Some(reading);
        }

        if state == TriggerState::Active && self.trigger.gates_condition() {
            self.consecutive_failures = 0;
            self.condition.reset();
            self.last_condition = ConditionResult::Waiting;
            return Some(reading);
        }

        match self.condition.evaluate(&reading) {
            Ok(result) => {
                self.consecutive_failures = 0;
                self.last_condition = result;
            }
            Err(err) => {
                self.count_failure(Stage::Evaluating, &err);
                return Some(reading);
            }
        }

        if self.last_condition.is_met() && !self.scheduler.state().is_in_flight() {
            self.arm();
        }
        Some(reading)
    }

    fn arm(&mut self) {
        if let Err(err) = self.action.validate() {
            self.fail(Stage::Scheduling, &err);
            return;
        }
        match self.scheduler.schedule(Arc::clone(&self.action)) {
            Ok(()) => tracing::info!(session = %self.id, action = self.action.id(), "condition met"),
            Err(err) => self.fail(Stage::Scheduling, &err),
        }
    }

    fn count_failure(&mut self, stage: Stage, err: &(dyn std::error::Error + 'static)) {
        self.consecutive_failures += 1;
        tracing::warn!(
            session = %self.id,
            %stage,
            error = %err,
            failures = self.consecutive_failures,
            "tick failed"
        );
        if self.consecutive_failures >= self.max_consecutive_failures {
            self.fail(stage, err);
        }
    }

    fn fail(&mut self, stage: Stage, err: &(dyn std::error::Error + 'static)) {
        let message = stage.describe(err);
        tracing::error!(session = %self.id, %message, "session errored");
        self.status = SessionStatus::Errored;
        self.record(LogStatus::Error, Some(message.clone()));
        self.last_error = Some(message);
    }

    /// Record and react to a terminal scheduler state reached this tick.
    fn settle_scheduler(&mut self) {
        if self.scheduler.state() == SchedulerState::Executed {
            self.record(LogStatus::Executed, None);
            self.finish();
        }
    }

    fn finish(&mut self) {
        self.status = SessionStatus::Finished;
        self.last_condition = ConditionResult::Waiting;
        self.trigger.stop();
    }

    /// Cancel the armed action; monitoring continues with a fresh streak.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidTransition`] when nothing is in flight.
    pub fn cancel_action(&mut self) -> Result<(), SchedulerError> {
        self.scheduler.cancel()?;
        self.condition.reset();
        self.last_condition = ConditionResult::Waiting;
        self.record(LogStatus::Cancelled, Some("cancelled by user".to_string()));
        Ok(())
    }

    /// Run the armed action immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ExecuteNowError::Scheduler`] when nothing is in flight and
    /// [`ExecuteNowError::Action`] when the action failed (the session is
    /// then errored).
    pub fn execute_action_now(&mut self) -> Result<(), ExecuteNowError> {
        match self.scheduler.execute_now() {
            Ok(()) => {
                self.record(LogStatus::Executed, Some("executed ahead of countdown".to_string()));
                self.finish();
                Ok(())
            }
            Err(ExecuteNowError::Action(err)) => {
                self.fail(Stage::Executing, &err);
                Err(ExecuteNowError::Action(err))
            }
            Err(err) => Err(err),
        }
    }

    /// Freeze the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoSession`] unless the session is monitoring.
    pub fn pause(&mut self) -> Result<(), SessionError> {
        if self.status != SessionStatus::Monitoring {
            return Err(SessionError::NoSession);
        }
        self.status = SessionStatus::Paused;
        self.record(LogStatus::Info, Some("monitoring paused".to_string()));
        Ok(())
    }

    /// Resume after a pause or an error with a clean slate: no failure
    /// count, no streak, no sampler history.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotPaused`] unless paused or errored.
    pub fn resume(&mut self) -> Result<(), SessionError> {
        if !matches!(self.status, SessionStatus::Paused | SessionStatus::Errored) {
            return Err(SessionError::NotPaused);
        }
        self.status = SessionStatus::Monitoring;
        self.consecutive_failures = 0;
        self.last_error = None;
        self.condition.reset();
        self.last_condition = ConditionResult::Waiting;
        self.trigger.reset();
        if self.scheduler.state() == SchedulerState::Failed {
            self.scheduler.reset();
        }
        self.record(LogStatus::Info, Some("monitoring resumed".to_string()));
        Ok(())
    }

    /// Stop the trigger and abort any armed action.
    pub fn stop(&mut self) {
        if self.scheduler.state().is_in_flight() && self.scheduler.cancel().is_ok() {
            self.record(LogStatus::Cancelled, Some("session stopped".to_string()));
        }
        self.trigger.stop();
        if self.status != SessionStatus::Finished {
            self.record(LogStatus::Info, Some("monitoring stopped".to_string()));
        }
        self.status = SessionStatus::Finished;
        self.last_condition = ConditionResult::Waiting;
    }

    /// Current state without reading the trigger or draining events.
    #[must_use]
    pub fn snapshot(&self) -> TickReport {
        TickReport {
            session_id: self.id,
            status: self.status,
            trigger_state: self.trigger.state(),
            reading: None,
            condition: self.last_condition,
            scheduler_state: self.scheduler.state(),
            remaining_seconds: self.scheduler.remaining(),
            events: Vec::new(),
        }
    }

    fn report(&mut self, reading: Option<Reading>) -> TickReport {
        TickReport {
            reading,
            events: self.scheduler.take_events(),
            ..self.snapshot()
        }
    }

    fn record(&mut self, status: LogStatus, details: Option<String>) {
        let mut entry = LogEntry::new(self.reason.clone(), self.action.name(), status);
        if let Some(details) = details {
            entry = entry.with_details(details);
        }
        self.pending_log.push(entry);
    }
}
