use std::sync::Arc;

use crate::adjuncts::InstanceAdjuncts;
use crate::types::InstanceId;
use async_trait::async_trait;

/// Cache interface for per-instance adjunct snapshots.
///
/// Implementations only store and drop snapshots; deciding whether a
/// snapshot is still current is the engine's job.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Gets the cached snapshot of an instance.
    async fn get_adjuncts(&self, instance: &InstanceId) -> Option<Arc<InstanceAdjuncts>>;

    /// Stores the snapshot of an instance, replacing any previous one.
    async fn set_adjuncts(&self, instance: &InstanceId, adjuncts: Arc<InstanceAdjuncts>);

    /// Drops the snapshot of an instance.
    async fn invalidate_instance(&self, instance: &InstanceId);

    /// Drops every snapshot.
    async fn clear(&self);
}

/// No-op cache implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

#[async_trait]
impl Cache for NoCache {
    async fn get_adjuncts(&self, _instance: &InstanceId) -> Option<Arc<InstanceAdjuncts>> {
        None
    }

    async fn set_adjuncts(&self, _instance: &InstanceId, _adjuncts: Arc<InstanceAdjuncts>) {}

    async fn invalidate_instance(&self, _instance: &InstanceId) {}

    async fn clear(&self) {}
}
