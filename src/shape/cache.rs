use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::{Shape, ShapeId, SignatureKey};
use crate::error::Result;
use crate::schema::TypeRef;

static NEXT_SHAPE_ID: AtomicU32 = AtomicU32::new(1);
static GLOBAL_CACHE: OnceLock<ShapeCache> = OnceLock::new();

/// Counters describing cache activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShapeCacheStats {
    /// Lookups answered by an existing shape.
    pub hits: u64,
    /// Lookups that synthesized a new shape.
    pub misses: u64,
    /// Shapes currently held.
    pub shapes: usize,
}

/// Append-only map from signature to shape.
///
/// Entries are never evicted. The lock covers only the lookup-or-insert
/// step; signature validation happens before it is taken, so a rejected
/// signature never reaches the map.
#[derive(Default)]
pub struct ShapeCache {
    entries: Mutex<HashMap<SignatureKey, Arc<Shape>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ShapeCache {
    /// Creates an empty, private cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache used unless a compiler is given its own.
    pub fn global() -> &'static ShapeCache {
        GLOBAL_CACHE.get_or_init(ShapeCache::new)
    }

    /// Returns the shape for `fields`, synthesizing it at most once.
    pub fn get_or_create(&self, fields: &[(String, TypeRef)]) -> Result<Arc<Shape>> {
        let key = SignatureKey::new(fields)?;
        let mut entries = self.entries.lock();
        if let Some(shape) = entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(shape = %shape.id(), signature = %key, "shape.cache.hit");
            return Ok(Arc::clone(shape));
        }
        let id = ShapeId(NEXT_SHAPE_ID.fetch_add(1, Ordering::Relaxed));
        let shape = Arc::new(Shape::synthesize(id, key.clone(), fields));
        entries.insert(key, Arc::clone(&shape));
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(
            shape = %id,
            signature = %shape.signature(),
            fields = fields.len(),
            "shape.cache.synthesize"
        );
        Ok(shape)
    }

    /// Looks up a shape by id.
    pub fn get(&self, id: ShapeId) -> Option<Arc<Shape>> {
        self.entries
            .lock()
            .values()
            .find(|shape| shape.id() == id)
            .cloned()
    }

    /// Number of shapes held.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no shape has been synthesized yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the hit/miss counters.
    pub fn stats(&self) -> ShapeCacheStats {
        ShapeCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            shapes: self.len(),
        }
    }
}
