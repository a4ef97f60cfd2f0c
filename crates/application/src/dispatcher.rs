//! Fan-out of change notifications to cache and audit subscribers.
//!
//! Services hand their committed change off to a [`ChangeDispatcher`] and
//! return immediately; a background task delivers the event to every
//! subscribed [`ChangeListener`]. A failing listener is logged and skipped,
//! so collaborator outages can never fail or roll back the mutation that
//! emitted the event.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use tessera_core::AppResult;
use tessera_domain::AccessDecision;

use crate::events::PermissionChangeEvent;
use crate::ports::{AuditLogRepository, NewAuditRecord, PermissionCache};

/// Receives change notifications after the owning operation committed.
#[async_trait]
pub trait ChangeListener: Send + Sync {
    /// Stable name used in delivery-failure logs.
    fn name(&self) -> &'static str;

    /// Handles one change notification.
    async fn on_change(&self, event: &PermissionChangeEvent) -> AppResult<()>;
}

/// Non-blocking entry point for emitting change notifications.
#[derive(Clone)]
pub struct ChangeDispatcher {
    sender: mpsc::UnboundedSender<PermissionChangeEvent>,
}

impl ChangeDispatcher {
    /// Spawns the delivery task and returns a dispatcher handle.
    ///
    /// Events are delivered to listeners in subscription order. Delivery
    /// happens off the caller's path; `dispatch` never waits.
    #[must_use]
    pub fn spawn(listeners: Vec<Arc<dyn ChangeListener>>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<PermissionChangeEvent>();

        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                for listener in &listeners {
                    if let Err(error) = listener.on_change(&event).await {
                        tracing::warn!(
                            listener = listener.name(),
                            action = event.action().as_str(),
                            user_id = event.user_id(),
                            "change listener failed: {error}"
                        );
                    }
                }
            }
        });

        Self { sender }
    }

    /// Enqueues one event for delivery.
    pub fn dispatch(&self, event: PermissionChangeEvent) {
        if self.sender.send(event).is_err() {
            tracing::warn!("change dispatcher task is gone; dropping notification");
        }
    }
}

/// Invalidates cached permission sets for every user an event touches.
pub struct CacheInvalidationListener {
    cache: Arc<dyn PermissionCache>,
}

impl CacheInvalidationListener {
    /// Creates a listener over the given cache.
    #[must_use]
    pub fn new(cache: Arc<dyn PermissionCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl ChangeListener for CacheInvalidationListener {
    fn name(&self) -> &'static str {
        "cache-invalidation"
    }

    async fn on_change(&self, event: &PermissionChangeEvent) -> AppResult<()> {
        self.cache.invalidate(event.user_id()).await?;

        for user_id in event.affected_user_ids() {
            if user_id != event.user_id() {
                self.cache.invalidate(user_id).await?;
            }
        }

        Ok(())
    }
}

/// Records every change notification in the durable audit trail.
pub struct AuditTrailListener {
    audit_log: Arc<dyn AuditLogRepository>,
}

impl AuditTrailListener {
    /// Creates a listener over the given audit repository.
    #[must_use]
    pub fn new(audit_log: Arc<dyn AuditLogRepository>) -> Self {
        Self { audit_log }
    }
}

#[async_trait]
impl ChangeListener for AuditTrailListener {
    fn name(&self) -> &'static str {
        "audit-trail"
    }

    async fn on_change(&self, event: &PermissionChangeEvent) -> AppResult<()> {
        let reason = (!event.context().is_empty())
            .then(|| serde_json::to_string(event.context()).unwrap_or_default());

        self.audit_log
            .append(NewAuditRecord {
                user_id: Some(event.user_id().to_owned()),
                action: event.action().as_str().to_owned(),
                resource_type: None,
                resource_id: None,
                decision: AccessDecision::Granted,
                reason,
                client_ip: None,
                user_agent: None,
            })
            .await
    }
}
