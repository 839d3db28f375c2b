//! Monitor engine — the single entry point the daemon talks to.
//!
//! Owns at most one live [`MonitorSession`], the shared [`ActivityLog`] and
//! the discovery registries. Every session transition is appended to the
//! log, persisted through [`ActivityLogStore`] and published as a
//! [`MonitorEvent`].

use std::sync::Arc;

use idlewatch_domain::action::ActionInfo;
use idlewatch_domain::activity::{ExportFormat, LogEntry};
use idlewatch_domain::error::{IdleWatchError, SessionError};
use idlewatch_domain::id::SessionId;
use idlewatch_domain::monitoring::MonitoringConfig;
use idlewatch_domain::session::{MonitorEvent, SessionStatus, TickReport};
use idlewatch_domain::signal::ProcessSuggestion;
use idlewatch_domain::time::now;
use idlewatch_domain::trigger::TriggerInfo;
use tokio::sync::Mutex;

use crate::action_catalog::ActionCatalog;
use crate::activity_log::ActivityLog;
use crate::ports::{ActivityLogStore, CounterSource, EventPublisher, ProcessActivitySource};
use crate::scheduler::ExecuteNowError;
use crate::session::MonitorSession;
use crate::trigger::{ConfiguredTrigger, TriggerFactory};

type Session<C, P> = MonitorSession<ConfiguredTrigger<C, P>>;

/// Orchestrates sessions, discovery and the activity log.
pub struct MonitorEngine<C, P, St, Pb> {
    factory: TriggerFactory<C, P>,
    catalog: ActionCatalog,
    log: Arc<ActivityLog>,
    store: St,
    publisher: Pb,
    session: Mutex<Option<Session<C, P>>>,
    max_consecutive_failures: u32,
}

impl<C, P, St, Pb> MonitorEngine<C, P, St, Pb>
where
    C: CounterSource + Clone + 'static,
    P: ProcessActivitySource + Clone + 'static,
    St: ActivityLogStore,
    Pb: EventPublisher,
{
    pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 3;

    pub fn new(
        factory: TriggerFactory<C, P>,
        catalog: ActionCatalog,
        log: Arc<ActivityLog>,
        store: St,
        publisher: Pb,
    ) -> Self {
        Self {
            factory,
            catalog,
            log,
            store,
            publisher,
            session: Mutex::new(None),
            max_consecutive_failures: Self::DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }

    /// Consecutive read/evaluate failures tolerated before a session errors.
    #[must_use]
    pub fn with_max_consecutive_failures(mut self, max: u32) -> Self {
        self.max_consecutive_failures = max.max(1);
        self
    }

    #[must_use]
    pub fn activity_log(&self) -> &Arc<ActivityLog> {
        &self.log
    }

    /// Seed the in-memory log from the store.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    #[tracing::instrument(skip(self))]
    pub async fn load_activity_log(&self) -> Result<usize, IdleWatchError> {
        let entries = self.store.load().await?;
        let loaded = self.log.extend(entries);
        tracing::info!(loaded, "activity log loaded");
        Ok(loaded)
    }

    /// Validate `config`, then start monitoring.
    ///
    /// # Errors
    ///
    /// - [`IdleWatchError::Config`] for invalid parameters;
    /// - [`IdleWatchError::Action`] for an unknown or unavailable action;
    /// - [`IdleWatchError::Session`] when a live session already exists;
    /// - [`IdleWatchError::Trigger`] when the trigger cannot start.
    #[tracing::instrument(skip(self, config), fields(trigger = %config.trigger.kind(), action = %config.action))]
    pub async fn start_session(&self, config: MonitoringConfig) -> Result<SessionId, IdleWatchError> {
        config.validate()?;
        let action = self.catalog.get(&config.action)?;
        action.validate()?;

        let mut guard = self.session.lock().await;
        if let Some(existing) = guard.as_ref()
            && existing.status().is_live()
        {
            return Err(SessionError::AlreadyActive(existing.id()).into());
        }

        let trigger = self.factory.build(&config.trigger);
        let mut session =
            MonitorSession::new(&config, trigger, action, self.max_consecutive_failures);
        session.start().await?;

        let session_id = session.id();
        tracing::info!(%session_id, "session started");
        self.absorb(&mut session).await;
        *guard = Some(session);
        drop(guard);

        let _ = self
            .publisher
            .publish(MonitorEvent::SessionStarted { session_id })
            .await;
        Ok(session_id)
    }

    /// Stop the session, aborting any armed action.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoSession`] when nothing is running.
    #[tracing::instrument(skip(self))]
    pub async fn stop_session(&self) -> Result<(), IdleWatchError> {
        let mut session = self
            .session
            .lock()
            .await
            .take()
            .ok_or(SessionError::NoSession)?;
        session.stop();
        let session_id = session.id();
        tracing::info!(%session_id, "session stopped");
        self.absorb(&mut session).await;

        let _ = self
            .publisher
            .publish(MonitorEvent::SessionStopped { session_id })
            .await;
        Ok(())
    }

    /// Advance the session by one tick (call once per second).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoSession`] when nothing is running. Pipeline
    /// failures are reported through the session status, not here.
    pub async fn step(&self) -> Result<TickReport, IdleWatchError> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(SessionError::NoSession)?;

        let before = session.status();
        let report = session.step().await;
        let errored = errored_event(before, session);
        self.absorb(session).await;
        drop(guard);

        let _ = self.publisher.publish(MonitorEvent::Tick(report.clone())).await;
        if let Some(event) = errored {
            let _ = self.publisher.publish(event).await;
        }
        Ok(report)
    }

    /// Current session state, if any, without advancing it.
    pub async fn status(&self) -> Option<TickReport> {
        self.session.lock().await.as_ref().map(MonitorSession::snapshot)
    }

    /// Abort the armed action; monitoring continues.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoSession`] or a scheduler transition error
    /// when nothing is armed.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_action(&self) -> Result<(), IdleWatchError> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(SessionError::NoSession)?;
        let result = session.cancel_action();
        self.absorb(session).await;
        Ok(result?)
    }

    /// Run the armed action immediately.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoSession`], a scheduler transition error
    /// when nothing is armed, or the action's failure.
    #[tracing::instrument(skip(self))]
    pub async fn execute_action_now(&self) -> Result<(), IdleWatchError> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(SessionError::NoSession)?;

        let before = session.status();
        let result = session.execute_action_now();
        let errored = errored_event(before, session);
        self.absorb(session).await;
        drop(guard);

        if let Some(event) = errored {
            let _ = self.publisher.publish(event).await;
        }
        result.map_err(|err| match err {
            ExecuteNowError::Scheduler(err) => err.into(),
            ExecuteNowError::Action(err) => err.into(),
        })
    }

    /// # Errors
    ///
    /// Returns [`SessionError::NoSession`] unless a session is monitoring.
    #[tracing::instrument(skip(self))]
    pub async fn pause(&self) -> Result<(), IdleWatchError> {
        let session_id = self.with_session(MonitorSession::pause).await?;
        let _ = self
            .publisher
            .publish(MonitorEvent::SessionPaused { session_id })
            .await;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`SessionError::NotPaused`] unless the session is paused or
    /// errored.
    #[tracing::instrument(skip(self))]
    pub async fn resume(&self) -> Result<(), IdleWatchError> {
        let session_id = self.with_session(MonitorSession::resume).await?;
        let _ = self
            .publisher
            .publish(MonitorEvent::SessionResumed { session_id })
            .await;
        Ok(())
    }

    async fn with_session(
        &self,
        op: impl FnOnce(&mut Session<C, P>) -> Result<(), SessionError>,
    ) -> Result<SessionId, IdleWatchError> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(SessionError::NoSession)?;
        op(session)?;
        self.absorb(session).await;
        Ok(session.id())
    }

    // -- discovery --

    #[must_use]
    pub fn list_trigger_kinds(&self) -> Vec<TriggerInfo> {
        self.factory.list_kinds()
    }

    #[must_use]
    pub fn list_actions(&self) -> Vec<ActionInfo> {
        self.catalog.list()
    }

    /// Running processes ranked by activity.
    ///
    /// # Errors
    ///
    /// Returns [`IdleWatchError::Trigger`] when processes cannot be sampled.
    pub async fn suggest_processes(
        &self,
        top_n: usize,
    ) -> Result<Vec<ProcessSuggestion>, IdleWatchError> {
        Ok(self.factory.suggest_processes(top_n).await?)
    }

    // -- activity log --

    #[must_use]
    pub fn log_entries(&self, query: Option<&str>) -> Vec<LogEntry> {
        match query {
            Some(query) => self.log.get_filtered(query),
            None => self.log.get_all(),
        }
    }

    /// # Errors
    ///
    /// Returns [`IdleWatchError::LogFormat`] if encoding fails.
    pub fn export_log(&self, format: ExportFormat) -> Result<String, IdleWatchError> {
        Ok(self.log.export(format)?)
    }

    /// Append entries parsed from `text`; nothing is appended on error.
    ///
    /// # Errors
    ///
    /// Returns [`IdleWatchError::LogFormat`] for malformed input, or the
    /// store's error.
    #[tracing::instrument(skip(self, text))]
    pub async fn import_log(&self, format: ExportFormat, text: &str) -> Result<usize, IdleWatchError> {
        let imported = self.log.import(format, text)?;
        self.persist().await?;
        Ok(imported)
    }

    /// # Errors
    ///
    /// Returns the store's error.
    #[tracing::instrument(skip(self))]
    pub async fn clear_log(&self) -> Result<(), IdleWatchError> {
        self.log.clear();
        self.persist().await
    }

    /// Drop entries older than `days` days.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    #[tracing::instrument(skip(self))]
    pub async fn prune_log(&self, days: u32) -> Result<usize, IdleWatchError> {
        let pruned = self.log.prune_older_than(days, now());
        if pruned > 0 {
            self.persist().await?;
        }
        Ok(pruned)
    }

    async fn persist(&self) -> Result<(), IdleWatchError> {
        self.store.save(&self.log.get_all()).await
    }

    /// Move the session's pending entries into the log and persist them.
    async fn absorb(&self, session: &mut Session<C, P>) {
        let added = self.log.extend(session.take_log_entries());
        if added == 0 {
            return;
        }
        if let Err(err) = self.persist().await {
            tracing::warn!(error = %err, "failed to persist activity log");
        }
    }
}

fn errored_event<T: crate::trigger::Trigger>(
    before: SessionStatus,
    session: &MonitorSession<T>,
) -> Option<MonitorEvent> {
    (before != SessionStatus::Errored && session.status() == SessionStatus::Errored).then(|| {
        MonitorEvent::SessionErrored {
            session_id: session.id(),
            message: session.last_error().unwrap_or_default().to_string(),
        }
    })
}
