//! Runtime context
//!
//! A [`Runtime`] owns everything values share: one block pool per kind
//! group, the shared Uninit value, the member-name table and the optional
//! instance bookkeeping. It is cheap to clone; every [`Handle`] keeps one so
//! it can allocate replacement blocks.
//!
//! ## Uninit sharing
//!
//! All Uninit bindings share one block. The runtime creates it on first use
//! and holds it like any other reference; it goes back to its pool when the
//! runtime and every handle bound to it are gone.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};

use dashmap::DashMap;

use crate::array::ObjArray;
use crate::handle::{Handle, Reference};
use crate::kind::Kind;
use crate::member::MemberId;
use crate::pool::{DEFAULT_CHUNK_BLOCKS, Pool, PoolStats, Pooled};
use crate::value::Value;

/// A bound value block. Handles sharing one block copy it before writing.
pub type ValuePtr = Pooled<Value>;

/// Runtime construction options
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Track live handles with instance ids (default: false)
    pub instrumentation: bool,
    /// Blocks added per pool growth step (default: 256)
    pub chunk_blocks: usize,
    /// Per-pool block cap; exceeding it is fatal (default: none)
    pub max_blocks: Option<usize>,
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self {
            instrumentation: false,
            chunk_blocks: DEFAULT_CHUNK_BLOCKS,
            max_blocks: None,
        }
    }

    pub fn with_instrumentation(mut self, enabled: bool) -> Self {
        self.instrumentation = enabled;
        self
    }

    pub fn with_chunk_blocks(mut self, blocks: usize) -> Self {
        self.chunk_blocks = blocks;
        self
    }

    pub fn with_max_blocks(mut self, blocks: usize) -> Self {
        self.max_blocks = Some(blocks);
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle construction counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstanceStats {
    pub live: u64,
    pub constructions: u64,
}

struct Instrumentation {
    next_id: AtomicU64,
    stats: Mutex<InstanceStats>,
    live: DashMap<u64, Kind>,
}

impl Instrumentation {
    fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            stats: Mutex::new(InstanceStats::default()),
            live: DashMap::new(),
        }
    }

    fn register(&self, kind: Kind) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.live.insert(id, kind);
        {
            let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
            stats.live += 1;
            stats.constructions += 1;
        }
        tracing::trace!(instance = id, %kind, "Handle created");
        id
    }

    fn unregister(&self, id: u64) {
        if self.live.remove(&id).is_some() {
            let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
            stats.live -= 1;
        }
        tracing::trace!(instance = id, "Handle dropped");
    }
}

struct KindPools {
    uninit: Arc<Pool<Value>>,
    integer: Arc<Pool<Value>>,
    float: Arc<Pool<Value>>,
    string: Arc<Pool<Value>>,
    array: Arc<Pool<Value>>,
    error: Arc<Pool<Value>>,
    application: Arc<Pool<Value>>,
}

impl KindPools {
    fn new(config: &RuntimeConfig) -> Self {
        let pool = |name: &'static str| -> Arc<Pool<Value>> {
            Arc::new(Pool::with_limits(name, config.chunk_blocks, config.max_blocks))
        };
        Self {
            uninit: pool("uninit"),
            integer: pool("integer"),
            float: pool("float"),
            string: pool("string"),
            array: pool("array"),
            error: pool("error"),
            application: pool("application"),
        }
    }

    fn for_kind(&self, kind: Kind) -> &Arc<Pool<Value>> {
        match kind {
            Kind::Uninit => &self.uninit,
            Kind::Integer => &self.integer,
            Kind::Float => &self.float,
            Kind::String => &self.string,
            Kind::Array | Kind::Struct => &self.array,
            Kind::Error => &self.error,
            _ => &self.application,
        }
    }
}

/// Interned member names, compared case-insensitively.
struct MemberTable {
    ids: DashMap<String, MemberId>,
    names: RwLock<Vec<Arc<str>>>,
}

impl MemberTable {
    fn new() -> Self {
        Self {
            ids: DashMap::new(),
            names: RwLock::new(Vec::new()),
        }
    }

    fn intern(&self, name: &str) -> MemberId {
        let key = name.to_ascii_lowercase();
        if let Some(id) = self.ids.get(&key) {
            return *id;
        }
        *self.ids.entry(key).or_insert_with(|| {
            let mut names = self.names.write().unwrap_or_else(PoisonError::into_inner);
            names.push(Arc::from(name));
            MemberId::new(names.len() as u32 - 1)
        })
    }

    fn name(&self, id: MemberId) -> Option<Arc<str>> {
        let names = self.names.read().unwrap_or_else(PoisonError::into_inner);
        names.get(id.index()).cloned()
    }
}

struct RuntimeInner {
    config: RuntimeConfig,
    pools: KindPools,
    uninit: OnceLock<ValuePtr>,
    members: MemberTable,
    instrumentation: Option<Instrumentation>,
}

#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        tracing::debug!(
            instrumentation = config.instrumentation,
            chunk_blocks = config.chunk_blocks,
            max_blocks = ?config.max_blocks,
            "Creating runtime"
        );
        let instrumentation = config.instrumentation.then(Instrumentation::new);
        Self {
            inner: Arc::new(RuntimeInner {
                pools: KindPools::new(&config),
                uninit: OnceLock::new(),
                members: MemberTable::new(),
                instrumentation,
                config,
            }),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Move a value into a block from its kind's pool.
    ///
    /// Uninit values get the shared block instead.
    pub fn alloc(&self, value: Value) -> ValuePtr {
        if value.is_uninit() {
            return self.uninit_ptr();
        }
        self.alloc_unshared(value)
    }

    /// Allocate without sharing, even for Uninit.
    pub(crate) fn alloc_unshared(&self, value: Value) -> ValuePtr {
        self.inner.pools.for_kind(value.kind()).allocate(value)
    }

    /// The shared Uninit block.
    pub fn uninit_ptr(&self) -> ValuePtr {
        self.inner
            .uninit
            .get_or_init(|| self.alloc_unshared(Value::Uninit))
            .clone()
    }

    /// A new handle owning `ptr`.
    pub fn new_handle(&self, ptr: ValuePtr) -> Handle {
        Handle::new(self.clone(), ptr)
    }

    /// Bind a value to a fresh handle.
    pub fn bind(&self, value: Value) -> Reference {
        Reference::new(Arc::new(self.new_handle(self.alloc(value))))
    }

    /// A fresh handle bound to the shared Uninit block.
    pub fn uninit(&self) -> Reference {
        Reference::new(Arc::new(self.new_handle(self.uninit_ptr())))
    }

    /// Build an array from element values.
    pub fn array(&self, values: impl IntoIterator<Item = Value>) -> Value {
        let mut arr = ObjArray::new();
        for value in values {
            arr.push(self.bind(value));
        }
        Value::Array(arr)
    }

    /// Build a struct from `(name, value)` members in order.
    pub fn struct_value<N: Into<String>>(
        &self,
        members: impl IntoIterator<Item = (N, Value)>,
    ) -> Value {
        let mut arr = ObjArray::new();
        for (name, value) in members {
            arr.add_member(name, self.bind(value));
        }
        Value::Struct(arr)
    }

    /// Intern a member name.
    pub fn member_id(&self, name: &str) -> MemberId {
        self.inner.members.intern(name)
    }

    /// Name a member id was interned from.
    pub fn member_name(&self, id: MemberId) -> Option<Arc<str>> {
        self.inner.members.name(id)
    }

    pub fn pool_stats(&self, kind: Kind) -> PoolStats {
        self.inner.pools.for_kind(kind).stats()
    }

    /// Handle counters, when instrumentation is enabled.
    pub fn instance_stats(&self) -> Option<InstanceStats> {
        let instrumentation = self.inner.instrumentation.as_ref()?;
        let stats = instrumentation.stats.lock().unwrap_or_else(PoisonError::into_inner);
        Some(*stats)
    }

    /// Live handle ids and the kind each was created with, sorted by id.
    pub fn live_instances(&self) -> Vec<(u64, Kind)> {
        let Some(instrumentation) = &self.inner.instrumentation else {
            return Vec::new();
        };
        let mut live: Vec<_> = instrumentation
            .live
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        live.sort_unstable_by_key(|(id, _)| *id);
        live
    }

    pub(crate) fn register_instance(&self, kind: Kind) -> Option<u64> {
        self.inner.instrumentation.as_ref().map(|i| i.register(kind))
    }

    pub(crate) fn unregister_instance(&self, id: u64) {
        if let Some(instrumentation) = &self.inner.instrumentation {
            instrumentation.unregister(id);
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
