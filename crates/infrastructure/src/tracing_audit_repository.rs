use async_trait::async_trait;
use tracing::info;

use wardkeep_application::{AuditEvent, AuditRepository};
use wardkeep_core::AppResult;

/// Audit sink that writes events to the `wardkeep::audit` tracing target.
///
/// Used when the store runs in memory and no audit table exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditRepository;

#[async_trait]
impl AuditRepository for TracingAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        let actor = event
            .actor
            .map(|actor| actor.to_string())
            .unwrap_or_else(|| "system".to_owned());

        info!(
            target: "wardkeep::audit",
            actor = %actor,
            action = event.action.as_str(),
            resource_type = %event.resource_type,
            resource_id = %event.resource_id,
            detail = event.detail.as_deref().unwrap_or_default(),
            "audit event"
        );

        Ok(())
    }
}
