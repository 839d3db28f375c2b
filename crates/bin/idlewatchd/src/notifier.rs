//! Console notifier — turns session events into operator-facing messages.

use idlewatch_domain::scheduler::SchedulerEvent;
use idlewatch_domain::session::MonitorEvent;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::RecvError;

/// Render events until the bus closes.
pub async fn run(mut events: Receiver<MonitorEvent>, action: String) {
    loop {
        match events.recv().await {
            Ok(event) => render(&event, &action),
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "notifier lagged behind the event bus");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn render(event: &MonitorEvent, action: &str) {
    match event {
        MonitorEvent::SessionStarted { session_id } => {
            tracing::info!(%session_id, "monitoring started");
        }
        MonitorEvent::Tick(report) => {
            for scheduled in &report.events {
                render_scheduler(scheduled, action);
            }
        }
        MonitorEvent::SessionPaused { session_id } => {
            tracing::info!(%session_id, "monitoring paused");
        }
        MonitorEvent::SessionResumed { session_id } => {
            tracing::info!(%session_id, "monitoring resumed");
        }
        MonitorEvent::SessionErrored {
            session_id,
            message,
        } => {
            tracing::error!(%session_id, %message, "monitoring halted");
        }
        MonitorEvent::SessionStopped { session_id } => {
            tracing::info!(%session_id, "monitoring stopped");
        }
    }
}

fn render_scheduler(event: &SchedulerEvent, action: &str) {
    match event {
        SchedulerEvent::PreWarning {
            seconds_until_countdown,
        } => tracing::warn!(
            "idle detected: {action} countdown starts in {seconds_until_countdown}s (Ctrl-C to cancel)"
        ),
        SchedulerEvent::CountdownStarted { total_seconds } => {
            tracing::warn!("{action} in {total_seconds}s (Ctrl-C to cancel)");
        }
        SchedulerEvent::CountdownTick { remaining_seconds } => {
            if *remaining_seconds <= 10 || remaining_seconds % 10 == 0 {
                tracing::warn!("{action} in {remaining_seconds}s");
            }
        }
        SchedulerEvent::Executed => tracing::info!("{action} executed"),
        SchedulerEvent::Cancelled => tracing::info!("{action} cancelled"),
        SchedulerEvent::Failed { reason } => tracing::error!(%reason, "{action} failed"),
    }
}
