//! Change Propagation Tests
//!
//! Indexes follow mutations of member records:
//! - A change event moves the record between buckets
//! - Buckets emptied by a change are pruned
//! - Non-members and unindexed attributes are ignored
//! - Listeners are detached on remove, clear and drop
//! - Silent mutations surface as stale buckets and are swept on removal

use std::sync::Arc;

use parking_lot::Mutex;

use beanindex::{
    BeanIndexer, BeanType, ChangeSupport, IndexerConfig, Introspect, Observable, Value, ValueKind,
};

// =============================================================================
// Fixtures
// =============================================================================

/// Shared order handle, compared by identity
#[derive(Clone)]
struct Order(Arc<OrderInner>);

struct OrderInner {
    address: Mutex<Option<String>>,
    quantity: Mutex<i64>,
    note: Mutex<String>,
    changes: ChangeSupport,
}

impl Order {
    fn new(address: &str, quantity: i64) -> Self {
        Order(Arc::new(OrderInner {
            address: Mutex::new(Some(address.to_string())),
            quantity: Mutex::new(quantity),
            note: Mutex::new(String::new()),
            changes: ChangeSupport::new(),
        }))
    }

    fn set_quantity(&self, quantity: i64) {
        let old = std::mem::replace(&mut *self.0.quantity.lock(), quantity);
        self.0.changes.fire("quantity", old, quantity);
    }

    fn set_address(&self, address: Option<&str>) {
        let new = address.map(str::to_string);
        let old = std::mem::replace(&mut *self.0.address.lock(), new.clone());
        self.0
            .changes
            .fire_optional("address", old.map(Value::text), new.map(Value::text));
    }

    fn set_note(&self, note: &str) {
        let old = std::mem::replace(&mut *self.0.note.lock(), note.to_string());
        self.0.changes.fire("note", old.as_str(), note);
    }

    fn listeners(&self) -> usize {
        self.0.changes.listener_count()
    }
}

impl PartialEq for Order {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Order {}

impl std::hash::Hash for Order {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl Observable for Order {
    fn change_support(&self) -> &ChangeSupport {
        &self.0.changes
    }
}

impl Introspect for Order {
    fn describe() -> BeanType {
        BeanType::builder::<Order>("Order")
            .value("address", ValueKind::Text, |o| o.0.address.lock().clone())
            .value("quantity", ValueKind::Int, |o| *o.0.quantity.lock())
            .value("note", ValueKind::Text, |o| o.0.note.lock().clone())
            .observable()
            .build()
    }
}

/// Mutable handle that never announces its changes
#[derive(Clone)]
struct Gauge(Arc<Mutex<i64>>);

impl Gauge {
    fn set_silently(&self, level: i64) {
        *self.0.lock() = level;
    }
}

impl PartialEq for Gauge {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Gauge {}

impl std::hash::Hash for Gauge {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl Introspect for Gauge {
    fn describe() -> BeanType {
        BeanType::builder::<Gauge>("Gauge")
            .value("level", ValueKind::Int, |g| *g.0.lock())
            .build()
    }
}

fn orders() -> BeanIndexer<Order> {
    let indexer = BeanIndexer::with_config(IndexerConfig::quiet());
    indexer.add_unsorted_index("address").unwrap();
    indexer.add_sorted_index("quantity").unwrap();
    indexer
}

// =============================================================================
// Bucket Movement Tests
// =============================================================================

/// A quantity change moves the record to its new bucket.
#[test]
fn test_change_moves_record() {
    let indexer = orders();
    let order = Order::new("Main St", 1);
    let other = Order::new("Main St", 3);
    indexer.add_all(vec![order.clone(), other.clone()]);

    order.set_quantity(10);

    assert!(indexer.filter().having("quantity", 1).unwrap().is_empty());
    let found = indexer.filter().having("quantity", 10).unwrap().single_result().unwrap();
    assert!(found == order);

    let above = indexer.filter().having_greater("quantity", 3, false).unwrap();
    assert_eq!(above.len(), 1);
    assert!(above.contains(&order));
}

/// Buckets emptied by a change disappear from the value listing.
#[test]
fn test_change_prunes_bucket() {
    let indexer = orders();
    let order = Order::new("Main St", 1);
    indexer.add(order.clone());

    order.set_quantity(2);
    order.set_address(Some("High St"));

    assert_eq!(indexer.values_of("quantity").unwrap(), vec![Value::Int(2)]);
    assert_eq!(indexer.values_of("address").unwrap(), vec![Value::text("High St")]);
    assert_eq!(indexer.metrics().snapshot().changes_applied, 2);
}

/// Clearing an attribute removes the record from that index only.
#[test]
fn test_change_to_absent() {
    let indexer = orders();
    let order = Order::new("Main St", 4);
    indexer.add(order.clone());

    order.set_address(None);

    assert!(indexer.values_of("address").unwrap().is_empty());
    assert!(indexer.filter().having("quantity", 4).unwrap().contains(&order));

    order.set_address(Some("Elm St"));
    assert!(indexer.filter().having("address", "Elm St").unwrap().contains(&order));
}

/// Several records sharing a bucket move independently.
#[test]
fn test_shared_bucket_split() {
    let indexer = orders();
    let a = Order::new("Main St", 5);
    let b = Order::new("Main St", 5);
    indexer.add_all(vec![a.clone(), b.clone()]);

    b.set_quantity(6);

    let fives = indexer.filter().having("quantity", 5).unwrap();
    assert_eq!(fives.len(), 1);
    assert!(fives.contains(&a));
    assert_eq!(indexer.values_of("quantity").unwrap(), vec![Value::Int(5), Value::Int(6)]);
}

// =============================================================================
// Ignored Change Tests
// =============================================================================

/// A change of an unindexed attribute is counted and ignored.
#[test]
fn test_unindexed_attribute_ignored() {
    let indexer = orders();
    let order = Order::new("Main St", 1);
    indexer.add(order.clone());

    order.set_note("fragile");

    let snapshot = indexer.metrics().snapshot();
    assert_eq!(snapshot.changes_applied, 0);
    assert_eq!(snapshot.changes_ignored, 1);
}

/// An index created after the change sees the current value.
#[test]
fn test_index_created_after_change() {
    let indexer = BeanIndexer::<Order>::with_config(IndexerConfig::quiet());
    let order = Order::new("Main St", 1);
    indexer.add(order.clone());

    order.set_quantity(7);
    indexer.add_sorted_index("quantity").unwrap();

    assert_eq!(indexer.values_of("quantity").unwrap(), vec![Value::Int(7)]);
}

// =============================================================================
// Subscription Lifecycle Tests
// =============================================================================

/// Each member holds exactly one listener, regardless of index count.
#[test]
fn test_single_subscription_per_member() {
    let indexer = orders();
    let order = Order::new("Main St", 1);
    indexer.add(order.clone());
    indexer.add(order.clone());
    indexer.add_unsorted_index("note").unwrap();

    assert_eq!(order.listeners(), 1);
}

/// Removed records no longer affect the indexes.
#[test]
fn test_removed_record_detached() {
    let indexer = orders();
    let order = Order::new("Main St", 1);
    indexer.add(order.clone());
    indexer.remove(&order);
    assert_eq!(order.listeners(), 0);

    order.set_quantity(9);
    assert!(indexer.values_of("quantity").unwrap().is_empty());
    assert_eq!(indexer.metrics().snapshot().changes_applied, 0);
}

/// Clearing and dropping the indexer detach every listener.
#[test]
fn test_clear_and_drop_detach() {
    let a = Order::new("Main St", 1);
    let b = Order::new("Main St", 2);

    let indexer = orders();
    indexer.add_all(vec![a.clone(), b.clone()]);
    indexer.clear();
    assert_eq!(a.listeners(), 0);
    assert_eq!(b.listeners(), 0);

    indexer.add(a.clone());
    assert_eq!(a.listeners(), 1);
    drop(indexer);
    assert_eq!(a.listeners(), 0);

    a.set_quantity(3);
}

/// A record may be indexed by two indexers at once.
#[test]
fn test_two_indexers() {
    let first = orders();
    let second = orders();
    let order = Order::new("Main St", 1);
    first.add(order.clone());
    second.add(order.clone());
    assert_eq!(order.listeners(), 2);

    order.set_quantity(2);
    assert_eq!(first.values_of("quantity").unwrap(), vec![Value::Int(2)]);
    assert_eq!(second.values_of("quantity").unwrap(), vec![Value::Int(2)]);
}

// =============================================================================
// Stale Bucket Tests
// =============================================================================

/// Removing a silently mutated record reports the bucket it was not found in
/// and still takes it out of the bucket it was indexed under.
#[test]
fn test_silent_mutation_reported_stale() {
    let indexer = BeanIndexer::<Gauge>::with_config(IndexerConfig::quiet());
    indexer.add_sorted_index("level").unwrap();
    let gauge = Gauge(Arc::new(Mutex::new(1)));
    indexer.add(gauge.clone());

    gauge.set_silently(5);
    assert!(indexer.remove(&gauge));

    let snapshot = indexer.metrics().snapshot();
    assert_eq!(snapshot.stale_buckets, 1);
    assert_eq!(snapshot.records_removed, 1);
    assert!(!indexer.contains(&gauge));
    assert!(indexer.values_of("level").unwrap().is_empty());
    assert!(indexer.filter().having("level", 1).unwrap().is_empty());
}

/// An unchanged unobservable record leaves cleanly.
#[test]
fn test_unchanged_record_not_stale() {
    let indexer = BeanIndexer::<Gauge>::with_config(IndexerConfig::quiet());
    indexer.add_sorted_index("level").unwrap();
    let gauge = Gauge(Arc::new(Mutex::new(1)));
    indexer.add(gauge.clone());

    assert!(indexer.remove(&gauge));
    assert_eq!(indexer.metrics().snapshot().stale_buckets, 0);
    assert!(indexer.values_of("level").unwrap().is_empty());
}
