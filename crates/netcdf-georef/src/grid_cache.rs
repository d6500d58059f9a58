//! Two-tier cache of fitted localization grids.
//!
//! Fitting a localization grid is expensive, and many variables of a file (or of
//! consecutive files of the same product) share the same longitude and latitude arrays.
//!
//! - [`LocalGridCache`] belongs to one decoder and is keyed by axis identity.
//! - [`GlobalGridCache`] is shared between decoders and threads. It is keyed by axis names
//!   and an MD5 digest of the coordinate values, holds values weakly, and keeps the most
//!   recently used ones strongly reachable in an LRU ring.

use crate::axis::Axis;
use crate::linearizer::LinearizerKind;
use georef_common::SingleCrs;
use lru::LruCache;
use projection::LocalizationGrid;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};
use tracing::debug;

/// Identity of a localization grid within one decoder.
///
/// The same axes give different grids depending on the dimension order of the variable
/// using them, so the storage orientation of each axis is part of the key.
#[derive(Debug, Clone)]
pub struct LocalKey {
    pub width: usize,
    pub height: usize,
    pub x: Arc<Axis>,
    pub y: Arc<Axis>,
    /// Whether the values of each axis are read transposed into the grid.
    pub transposed: [bool; 2],
}

impl LocalKey {
    pub fn new(width: usize, height: usize, x: Arc<Axis>, y: Arc<Axis>) -> Self {
        Self {
            width,
            height,
            x,
            y,
            transposed: [false; 2],
        }
    }

    pub fn with_transposed(mut self, transposed: [bool; 2]) -> Self {
        self.transposed = transposed;
        self
    }
}

impl PartialEq for LocalKey {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && Arc::ptr_eq(&self.x, &other.x)
            && Arc::ptr_eq(&self.y, &other.y)
            && self.transposed == other.transposed
    }
}

impl Eq for LocalKey {}

impl Hash for LocalKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.width.hash(state);
        self.height.hash(state);
        std::ptr::hash(Arc::as_ptr(&self.x), state);
        std::ptr::hash(Arc::as_ptr(&self.y), state);
        self.transposed.hash(state);
    }
}

/// Identity of a localization grid across decoders.
///
/// Does not retain the coordinate values, only their digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlobalKey {
    pub width: usize,
    pub height: usize,
    pub x_name: String,
    pub y_name: String,
    pub digest: [u8; 16],
    pub transposed: [bool; 2],
    pub linearizers: BTreeSet<LinearizerKind>,
    /// Bits of the desired inverse precision, 0 if unspecified.
    pub precision: u64,
}

impl GlobalKey {
    /// Derive a global key from a local one by digesting the values of both axes.
    ///
    /// Values are streamed as big-endian `f64` bytes through a buffer of `buffer_size` bytes.
    pub fn new(local: &LocalKey, linearizers: &BTreeSet<LinearizerKind>, buffer_size: usize) -> Self {
        let mut context = md5::Context::new();
        let chunk = (buffer_size / 8).max(1);
        let mut buffer = Vec::with_capacity(chunk * 8);
        for values in [local.x.values(), local.y.values()] {
            for block in values.chunks(chunk) {
                buffer.clear();
                for v in block {
                    buffer.extend_from_slice(&v.to_be_bytes());
                }
                context.consume(&buffer);
            }
        }
        Self {
            width: local.width,
            height: local.height,
            x_name: local.x.name().to_string(),
            y_name: local.y.name().to_string(),
            digest: context.compute().0,
            transposed: local.transposed,
            linearizers: linearizers.clone(),
            precision: 0,
        }
    }

    /// Grids fitted for different precisions are not shared.
    pub fn with_desired_precision(mut self, precision: f64) -> Self {
        self.precision = precision.to_bits();
        self
    }
}

/// A fitted grid with the projection selected by the fit, if any.
#[derive(Debug, Clone)]
pub struct GridCacheValue {
    pub grid: Arc<LocalizationGrid>,
    /// Projected CRS of the grid output, when a linearizer was selected.
    pub target: Option<SingleCrs>,
    /// Whether the control points were (longitude, latitude), making the grid output
    /// (easting, northing). Otherwise the output is (northing, easting).
    pub axis_swap: bool,
}

impl GridCacheValue {
    /// The projected CRS with its axes in the order of the grid output.
    pub fn output_crs(&self) -> Option<SingleCrs> {
        let mut crs = self.target.clone()?;
        if !self.axis_swap {
            crs.axes.reverse();
            crs.identifier = None;
        }
        Some(crs)
    }
}

/// Per-decoder cache keyed by axis identity.
#[derive(Debug, Default)]
pub struct LocalGridCache {
    entries: HashMap<LocalKey, Arc<GridCacheValue>>,
}

impl LocalGridCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &LocalKey) -> Option<Arc<GridCacheValue>> {
        self.entries.get(key).cloned()
    }

    /// Insert the value unless the key is already present, and return the cached value.
    pub fn insert_if_absent(&mut self, key: LocalKey, value: Arc<GridCacheValue>) -> Arc<GridCacheValue> {
        Arc::clone(self.entries.entry(key).or_insert(value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Statistics of the global grid cache.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GridCacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Number of computations started, including failed ones.
    pub computations: u64,
}

impl GridCacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Debug)]
enum Slot {
    Computing,
    Ready(Weak<GridCacheValue>),
}

/// Process-wide cache of fitted grids, safe to share between threads.
///
/// Each key is computed at most once at a time: concurrent callers for a key being computed
/// wait for the result. A failed computation stores nothing and the waiters retry.
pub struct GlobalGridCache {
    slots: Mutex<HashMap<GlobalKey, Slot>>,
    ready: Condvar,
    recent: Mutex<LruCache<GlobalKey, Arc<GridCacheValue>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    computations: AtomicU64,
}

impl GlobalGridCache {
    /// Create a cache keeping at most `capacity` values strongly reachable.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            slots: Mutex::new(HashMap::new()),
            ready: Condvar::new(),
            recent: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            computations: AtomicU64::new(0),
        }
    }

    /// Return the cached value for the key, computing it if absent.
    ///
    /// The computation runs without holding any lock.
    pub fn get_or_compute<E, F>(&self, key: &GlobalKey, compute: F) -> Result<Arc<GridCacheValue>, E>
    where
        F: FnOnce() -> Result<GridCacheValue, E>,
    {
        let mut slots = self.lock_slots();
        loop {
            match slots.get(key) {
                Some(Slot::Ready(weak)) => {
                    if let Some(value) = weak.upgrade() {
                        drop(slots);
                        self.hits.fetch_add(1, Ordering::Relaxed);
                        self.touch(key, &value);
                        return Ok(value);
                    }
                    break;
                }
                Some(Slot::Computing) => {
                    slots = match self.ready.wait(slots) {
                        Ok(guard) => guard,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                }
                None => break,
            }
        }
        slots.insert(key.clone(), Slot::Computing);
        slots.retain(|_, slot| match slot {
            Slot::Ready(weak) => weak.strong_count() > 0,
            Slot::Computing => true,
        });
        drop(slots);
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.computations.fetch_add(1, Ordering::Relaxed);

        let mut pending = PendingSlot {
            cache: self,
            key,
            done: false,
        };
        let value = Arc::new(compute()?);
        self.lock_slots()
            .insert(key.clone(), Slot::Ready(Arc::downgrade(&value)));
        pending.done = true;
        self.ready.notify_all();
        self.touch(key, &value);
        debug!(
            x = %key.x_name,
            y = %key.y_name,
            width = key.width,
            height = key.height,
            "Stored localization grid in global cache"
        );
        Ok(value)
    }

    /// Snapshot of the cache statistics.
    pub fn stats(&self) -> GridCacheStats {
        GridCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            computations: self.computations.load(Ordering::Relaxed),
        }
    }

    /// Number of values kept strongly reachable.
    pub fn retained(&self) -> usize {
        match self.recent.lock() {
            Ok(recent) => recent.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    fn touch(&self, key: &GlobalKey, value: &Arc<GridCacheValue>) {
        match self.recent.lock() {
            Ok(mut recent) => {
                recent.put(key.clone(), Arc::clone(value));
            }
            Err(poisoned) => {
                poisoned.into_inner().put(key.clone(), Arc::clone(value));
            }
        }
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<GlobalKey, Slot>> {
        match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for GlobalGridCache {
    fn default() -> Self {
        Self::new(16)
    }
}

impl std::fmt::Debug for GlobalGridCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalGridCache")
            .field("stats", &self.stats())
            .field("retained", &self.retained())
            .finish()
    }
}

/// Removes the `Computing` slot and wakes waiters if the computation fails or panics.
struct PendingSlot<'a> {
    cache: &'a GlobalGridCache,
    key: &'a GlobalKey,
    done: bool,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.cache.lock_slots().remove(self.key);
            self.cache.ready.notify_all();
        }
    }
}
