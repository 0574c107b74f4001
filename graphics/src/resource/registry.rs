use std::sync::Arc;

use crate::backend::ResourceManager;

use super::record::{RecordState, ResourceId, ResourceInit, ResourceKind, ResourceRecord};

/// Ready/failed/total counts over a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadProgress {
    pub ready: usize,
    pub failed: usize,
    pub total: usize,
}

impl LoadProgress {
    /// Records neither ready nor failed.
    pub fn pending(&self) -> usize {
        self.total - self.ready - self.failed
    }

    /// Whether every record is ready.
    pub fn is_complete(&self) -> bool {
        self.ready == self.total
    }

    /// Ready fraction in `[0, 1]`; an empty registry counts as complete.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.ready as f32 / self.total as f32
        }
    }
}

/// Append-only collection of records, used during the registration phase.
///
/// Declaration order is the order records are scanned and handed out by the
/// loader, and the order they are freed in.
#[derive(Default)]
pub struct ResourceRegistryBuilder {
    records: Vec<ResourceRecord>,
}

impl ResourceRegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record and return a typed handle to its payload.
    pub fn register<R>(&mut self, description: impl Into<String>, resource: R) -> Arc<R>
    where
        R: ResourceInit + 'static,
    {
        let resource = Arc::new(resource);
        let id = ResourceId(self.records.len());
        let payload: Arc<dyn ResourceInit> = resource.clone();
        self.records
            .push(ResourceRecord::new(id, description.into(), payload));
        resource
    }

    /// Number of records declared so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been declared.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Freeze the registry.
    pub fn build(self) -> ResourceRegistry {
        log::debug!("Resource registry frozen with {} record(s)", self.records.len());
        ResourceRegistry {
            records: self.records,
        }
    }
}

/// The frozen, read-only set of declared records.
///
/// Safe to iterate from any number of loader threads at once: the list never
/// changes, and each record guards its own state.
#[derive(Debug)]
pub struct ResourceRegistry {
    records: Vec<ResourceRecord>,
}

static_assertions::assert_impl_all!(ResourceRegistry: Send, Sync);

impl ResourceRegistry {
    /// Start declaring records.
    pub fn builder() -> ResourceRegistryBuilder {
        ResourceRegistryBuilder::new()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record by id.
    pub fn get(&self, id: ResourceId) -> Option<&ResourceRecord> {
        self.records.get(id.0)
    }

    /// Records in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, ResourceRecord> {
        self.records.iter()
    }

    /// Records of one kind.
    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceRecord> {
        self.records.iter().filter(move |r| r.kind() == kind)
    }

    /// Records that are not ready (declared or failed).
    pub fn pending(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.records.iter().filter(|r| !r.is_initialized())
    }

    /// Current ready/failed counts.
    pub fn progress(&self) -> LoadProgress {
        let mut progress = LoadProgress {
            total: self.records.len(),
            ..Default::default()
        };
        for record in &self.records {
            match record.state() {
                RecordState::Ready => progress.ready += 1,
                RecordState::Failed => progress.failed += 1,
                RecordState::Declared => {}
            }
        }
        progress
    }

    /// Whether every record is ready.
    pub fn is_fully_initialized(&self) -> bool {
        self.records.iter().all(ResourceRecord::is_initialized)
    }

    /// Free every record. Returns how many were freed.
    ///
    /// Meant for single-threaded teardown after loading finished. A record
    /// whose lock is still held (a loader thread detached while stuck in its
    /// `init`) is skipped with a warning rather than waited on.
    pub fn free_all(&self, resource_manager: &dyn ResourceManager) -> usize {
        let mut freed = 0;
        for record in &self.records {
            match record.try_lock() {
                Some(mut guard) => freed += usize::from(guard.free(resource_manager)),
                None => log::warn!(
                    "Skipping {} \"{}\": still locked by a loader thread",
                    record.kind(),
                    record.description()
                ),
            }
        }
        log::info!("Freed {freed} of {} resource record(s)", self.records.len());
        freed
    }

    /// Records whose lock is currently held.
    pub fn busy(&self) -> usize {
        self.records.iter().filter(|record| record.is_busy()).count()
    }
}

impl<'a> IntoIterator for &'a ResourceRegistry {
    type Item = &'a ResourceRecord;
    type IntoIter = std::slice::Iter<'a, ResourceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
