//! Process-wide memoization of attribute tables and resolved chains
//!
//! Both caches are populated lazily. A chain is fully built before it is
//! published, so readers never observe a partial chain; when two threads
//! resolve the same key concurrently the first insert wins and the loser's
//! (identical) chain is dropped.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use super::chain::{PropertyChain, Step};
use super::errors::{PropertyError, PropertyResult};
use super::types::{BeanType, Introspect, PropertyDescriptor};

type TypeCache = RwLock<HashMap<TypeId, Arc<BeanType>>>;
type ChainCache = RwLock<HashMap<(TypeId, String), Arc<PropertyChain>>>;

fn types() -> &'static TypeCache {
    static TYPES: OnceLock<TypeCache> = OnceLock::new();
    TYPES.get_or_init(Default::default)
}

fn chains() -> &'static ChainCache {
    static CHAINS: OnceLock<ChainCache> = OnceLock::new();
    CHAINS.get_or_init(Default::default)
}

/// Attribute table of `T`, built on first use.
pub fn bean_type<T: Introspect>() -> Arc<BeanType> {
    let id = TypeId::of::<T>();
    if let Some(found) = types().read().get(&id) {
        return Arc::clone(found);
    }

    // Built outside the lock: describe() may touch other types.
    let described = Arc::new(T::describe());
    Arc::clone(types().write().entry(id).or_insert(described))
}

/// Readable attributes of `T` in declaration order.
pub fn properties<T: Introspect>() -> Vec<Arc<PropertyDescriptor>> {
    bean_type::<T>().properties().to_vec()
}

/// Resolve a dotted path against `T`.
pub fn resolve<T: Introspect>(path: &str) -> PropertyResult<Arc<PropertyChain>> {
    resolve_in(&bean_type::<T>(), path)
}

/// Resolve a dotted path against an already loaded table.
pub fn resolve_in(root: &Arc<BeanType>, path: &str) -> PropertyResult<Arc<PropertyChain>> {
    let key = (root.type_key(), path.to_string());
    if let Some(found) = chains().read().get(&key) {
        return Ok(Arc::clone(found));
    }

    let chain = Arc::new(build_chain(root, path)?);
    Ok(Arc::clone(chains().write().entry(key).or_insert(chain)))
}

fn build_chain(root: &Arc<BeanType>, path: &str) -> PropertyResult<PropertyChain> {
    if path.is_empty() {
        return Err(PropertyError::EmptyPath);
    }

    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(PropertyError::EmptyPath);
    }

    let mut steps = Vec::with_capacity(segments.len());
    let mut current = Arc::clone(root);

    for (i, segment) in segments.iter().enumerate() {
        let descriptor = current
            .property(segment)
            .cloned()
            .ok_or_else(|| PropertyError::unknown(current.name(), path))?;

        let last = i + 1 == segments.len();
        if !last {
            // Only a record (or a collection of records) can be descended into.
            current = descriptor
                .kind()
                .nested_type()
                .ok_or_else(|| PropertyError::unknown(current.name(), path))?;
        }

        steps.push(Step::new(descriptor));
    }

    Ok(PropertyChain::new(root.name(), path, steps))
}
