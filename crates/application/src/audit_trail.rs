use tracing::warn;

use crate::{AuditEvent, AuditRepository};

/// Appends an audit event without letting a sink failure fail the caller.
pub(crate) async fn record_event(audit: &dyn AuditRepository, event: AuditEvent) {
    let action = event.action;
    let resource_id = event.resource_id.clone();
    if let Err(error) = audit.append_event(event).await {
        warn!(
            action = action.as_str(),
            resource_id = %resource_id,
            error = %error,
            "dropped audit event"
        );
    }
}
