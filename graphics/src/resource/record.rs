use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::backend::ResourceManager;
use crate::error::{ResourceError, ResourceResult};

/// Stable identifier of a record: its position in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub usize);

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of GPU-backed object a record produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Model,
    Texture,
    Shader,
    RenderTarget,
    Material,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Model => "Model",
            Self::Texture => "Texture",
            Self::Shader => "Shader",
            Self::RenderTarget => "Render target",
            Self::Material => "Material",
        })
    }
}

/// Observable lifecycle state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordState {
    /// Declared but not (successfully) initialized.
    Declared,
    /// GPU objects exist.
    Ready,
    /// Initialization failed. Terminal until the record is freed.
    Failed,
}

const STATE_DECLARED: u8 = 0;
const STATE_READY: u8 = 1;
const STATE_FAILED: u8 = 2;

impl RecordState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            STATE_READY => Self::Ready,
            STATE_FAILED => Self::Failed,
            _ => Self::Declared,
        }
    }

    fn into_raw(self) -> u8 {
        match self {
            Self::Declared => STATE_DECLARED,
            Self::Ready => STATE_READY,
            Self::Failed => STATE_FAILED,
        }
    }
}

/// The payload of a record: knows how to create and destroy its GPU objects.
///
/// `init` and `free` are only ever called by [`RecordGuard`], i.e. while the
/// record's lock is held, so implementations may keep their handles behind
/// an uncontended inner lock.
pub trait ResourceInit: Send + Sync {
    /// Which kind of object this produces.
    fn kind(&self) -> ResourceKind;

    /// Create the GPU objects.
    fn init(&self, resource_manager: &dyn ResourceManager) -> ResourceResult<()>;

    /// Destroy the GPU objects. Must tolerate partially initialized state.
    fn free(&self, resource_manager: &dyn ResourceManager);
}

/// Result of a successful [`RecordGuard::init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// This call created the GPU objects.
    Initialized,
    /// Another holder of the lock had already created them.
    AlreadyInitialized,
}

#[derive(Debug, Default)]
struct RecordSlot {
    failure: Option<ResourceError>,
}

/// One lazily initialized GPU-backed object.
///
/// The `Declared -> Ready` transition happens at most once, under the
/// record's own lock; `Ready` only reverts through [`RecordGuard::free`].
/// The state is mirrored in an atomic so loaders can skip ready records
/// without touching the lock.
pub struct ResourceRecord {
    id: ResourceId,
    description: String,
    kind: ResourceKind,
    state: AtomicU8,
    slot: Mutex<RecordSlot>,
    payload: Arc<dyn ResourceInit>,
}

impl ResourceRecord {
    pub(crate) fn new(id: ResourceId, description: String, payload: Arc<dyn ResourceInit>) -> Self {
        Self {
            id,
            description,
            kind: payload.kind(),
            state: AtomicU8::new(STATE_DECLARED),
            slot: Mutex::new(RecordSlot::default()),
            payload,
        }
    }

    /// Registry index.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Human-readable description, e.g. a file path.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Kind tag.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Current state.
    pub fn state(&self) -> RecordState {
        RecordState::from_raw(self.state.load(Ordering::Acquire))
    }

    /// Whether the GPU objects exist.
    pub fn is_initialized(&self) -> bool {
        self.state() == RecordState::Ready
    }

    /// Whether initialization failed.
    pub fn is_failed(&self) -> bool {
        self.state() == RecordState::Failed
    }

    /// The error that put the record into [`RecordState::Failed`].
    pub fn failure(&self) -> Option<ResourceError> {
        self.slot.lock().failure.clone()
    }

    /// Take the record's lock without blocking.
    ///
    /// Returns `None` if another thread holds it (typically because it is
    /// initializing this very record).
    pub fn try_lock(&self) -> Option<RecordGuard<'_>> {
        self.slot.try_lock().map(|slot| RecordGuard { record: self, slot })
    }

    /// Whether some thread holds the record's lock right now.
    pub fn is_busy(&self) -> bool {
        self.slot.is_locked()
    }

    /// Take the record's lock, blocking until it is free.
    pub fn lock(&self) -> RecordGuard<'_> {
        RecordGuard {
            record: self,
            slot: self.slot.lock(),
        }
    }

    fn set_state(&self, state: RecordState) {
        self.state.store(state.into_raw(), Ordering::Release);
    }
}

impl std::fmt::Debug for ResourceRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRecord")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("kind", &self.kind)
            .field("state", &self.state())
            .finish()
    }
}

/// Exclusive access to a record. Dropping the guard unlocks it.
pub struct RecordGuard<'a> {
    record: &'a ResourceRecord,
    slot: MutexGuard<'a, RecordSlot>,
}

impl<'a> RecordGuard<'a> {
    /// The locked record.
    pub fn record(&self) -> &'a ResourceRecord {
        self.record
    }

    /// Create the record's GPU objects if that has not happened yet.
    ///
    /// A failed record stays failed: the stored error is returned again and
    /// the payload is not re-run.
    pub fn init(&mut self, resource_manager: &dyn ResourceManager) -> ResourceResult<InitOutcome> {
        match self.record.state() {
            RecordState::Ready => return Ok(InitOutcome::AlreadyInitialized),
            RecordState::Failed => {
                return Err(self
                    .slot
                    .failure
                    .clone()
                    .unwrap_or_else(|| ResourceError::Init("unknown failure".into())));
            }
            RecordState::Declared => {}
        }

        match self.record.payload.init(resource_manager) {
            Ok(()) => {
                self.record.set_state(RecordState::Ready);
                Ok(InitOutcome::Initialized)
            }
            Err(err) => {
                self.slot.failure = Some(err.clone());
                self.record.set_state(RecordState::Failed);
                Err(err)
            }
        }
    }

    /// Destroy the record's GPU objects and return it to `Declared`.
    ///
    /// Returns whether anything was freed. Failed records are freed too, so
    /// partially created objects do not leak.
    pub fn free(&mut self, resource_manager: &dyn ResourceManager) -> bool {
        match self.record.state() {
            RecordState::Declared => false,
            RecordState::Ready | RecordState::Failed => {
                self.record.payload.free(resource_manager);
                self.slot.failure = None;
                self.record.set_state(RecordState::Declared);
                true
            }
        }
    }
}
