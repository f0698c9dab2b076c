//! Application layer: the intake controller and decision engine, the
//! per-submitter session buffer they share, and the event dispatcher that
//! routes inbound gateway events to one of them.

pub mod decision;
pub mod intake;
pub mod service;
pub mod session;

use crate::domain::ports::MessagingGateway;

/// Log-channel delivery is best-effort everywhere: a failure is recorded and
/// swallowed, never propagated into the flow that produced the line.
pub(crate) async fn log_best_effort(gateway: &dyn MessagingGateway, line: &str) {
    if let Err(err) = gateway.notify_log(line).await {
        tracing::warn!(error = %err, "log channel notification failed");
    }
}
