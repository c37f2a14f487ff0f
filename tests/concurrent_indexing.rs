//! Concurrent Indexing Tests
//!
//! The thread-safe indexer mode under parallel use:
//! - Parallel adds and removes leave indexes consistent with membership
//! - Exactly one racing creator of an index reports creation
//! - Searches run alongside writers without observing torn buckets
//! - A remove racing with a pending change event leaves no bucket entry

use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

use parking_lot::Mutex;

use beanindex::index::IndexPlan;
use beanindex::{
    BeanIndexer, BeanType, ChangeSupport, Concurrent, IndexerConfig, Introspect, Observable, Value,
    ValueKind,
};

// =============================================================================
// Fixtures
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Reading {
    sensor: u32,
    seq: i64,
}

impl Introspect for Reading {
    fn describe() -> BeanType {
        BeanType::builder::<Reading>("Reading")
            .value("sensor", ValueKind::Int, |r| r.sensor)
            .value("seq", ValueKind::Int, |r| r.seq)
            .build()
    }
}

const THREADS: u32 = 8;
const PER_THREAD: i64 = 200;

fn shared() -> Arc<BeanIndexer<Reading, Concurrent>> {
    let plan = IndexPlan::new().unsorted("sensor").sorted("seq");
    Arc::new(BeanIndexer::concurrent_from_plan(&plan).unwrap())
}

/// Shared counter handle, compared by identity
#[derive(Clone)]
struct Cell(Arc<CellInner>);

struct CellInner {
    count: Mutex<i64>,
    changes: ChangeSupport,
}

impl Cell {
    fn new(count: i64) -> Self {
        Cell(Arc::new(CellInner {
            count: Mutex::new(count),
            changes: ChangeSupport::new(),
        }))
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Cell {}

impl std::hash::Hash for Cell {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl Observable for Cell {
    fn change_support(&self) -> &ChangeSupport {
        &self.0.changes
    }
}

impl Introspect for Cell {
    fn describe() -> BeanType {
        BeanType::builder::<Cell>("Cell")
            .value("count", ValueKind::Int, |c| *c.0.count.lock())
            .observable()
            .build()
    }
}

fn readings(sensor: u32) -> impl Iterator<Item = Reading> {
    (0..PER_THREAD).map(move |seq| Reading { sensor, seq })
}

// =============================================================================
// Parallel Membership Tests
// =============================================================================

/// Parallel adds from several threads all land in every index.
#[test]
fn test_parallel_adds() {
    let indexer = shared();

    let handles: Vec<_> = (0..THREADS)
        .map(|sensor| {
            let indexer = Arc::clone(&indexer);
            thread::spawn(move || indexer.add_all(readings(sensor)))
        })
        .collect();
    let added: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(added, (THREADS as i64 * PER_THREAD) as usize);
    assert_eq!(indexer.len(), added);
    for sensor in 0..THREADS {
        assert_eq!(
            indexer.filter().having("sensor", sensor).unwrap().len(),
            PER_THREAD as usize
        );
    }
    assert_eq!(indexer.values_of("seq").unwrap().len(), PER_THREAD as usize);
}

/// Interleaved adds and removes agree with the final membership.
#[test]
fn test_parallel_add_remove() {
    let indexer = shared();

    let handles: Vec<_> = (0..THREADS)
        .map(|sensor| {
            let indexer = Arc::clone(&indexer);
            thread::spawn(move || {
                for reading in readings(sensor) {
                    indexer.add(reading.clone());
                    if reading.seq % 2 == 1 {
                        indexer.remove(&reading);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let odd = indexer
        .filter()
        .is_in("seq", (0..PER_THREAD).filter(|s| s % 2 == 1))
        .unwrap();
    assert!(odd.is_empty());

    let all: HashSet<Reading> = indexer
        .filter()
        .having_greater("seq", 0, true)
        .unwrap()
        .into_results();
    assert_eq!(all, indexer.elements().into_iter().collect());
    assert_eq!(all.len(), (THREADS as i64 * PER_THREAD / 2) as usize);
}

// =============================================================================
// Index Creation Race Tests
// =============================================================================

/// Of several threads creating the same index, exactly one creates it.
#[test]
fn test_index_creation_race() {
    let indexer = Arc::new(BeanIndexer::<Reading, Concurrent>::concurrent_with_config(
        IndexerConfig::quiet(),
    ));
    indexer.add_all(readings(1));
    let barrier = Arc::new(Barrier::new(THREADS as usize));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let indexer = Arc::clone(&indexer);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                indexer.add_sorted_index("seq").unwrap()
            })
        })
        .collect();
    let created = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|created| *created)
        .count();

    assert_eq!(created, 1);
    assert_eq!(indexer.index_count(), 1);
    assert_eq!(indexer.metrics().snapshot().indexes_created, 1);
    assert_eq!(indexer.values_of("seq").unwrap().first(), Some(&Value::Int(0)));
}

// =============================================================================
// Reader/Writer Tests
// =============================================================================

/// Searches running next to a writer only ever see whole records.
#[test]
fn test_search_during_writes() {
    let indexer = shared();
    let writer = {
        let indexer = Arc::clone(&indexer);
        thread::spawn(move || {
            indexer.add_all(readings(7));
        })
    };

    for _ in 0..50 {
        let found = indexer.filter().having("sensor", 7u32).unwrap();
        for reading in found.results() {
            assert_eq!(reading.sensor, 7);
            assert!(reading.seq < PER_THREAD);
        }
    }
    writer.join().unwrap();

    assert_eq!(indexer.filter().having("sensor", 7u32).unwrap().len(), PER_THREAD as usize);
}

// =============================================================================
// Change/Remove Race Tests
// =============================================================================

/// A record removed between its mutation and the change event leaves no
/// entry in the bucket it was indexed under.
#[test]
fn test_remove_before_pending_event() {
    let indexer = BeanIndexer::<Cell, Concurrent>::concurrent_with_config(IndexerConfig::quiet());
    indexer.add_sorted_index("count").unwrap();
    let cell = Cell::new(1);
    indexer.add(cell.clone());

    let mutated = Arc::new(Barrier::new(2));
    let removed = Arc::new(Barrier::new(2));
    let writer = {
        let cell = cell.clone();
        let mutated = Arc::clone(&mutated);
        let removed = Arc::clone(&removed);
        thread::spawn(move || {
            let old = std::mem::replace(&mut *cell.0.count.lock(), 2);
            mutated.wait();
            removed.wait();
            cell.0.changes.fire("count", old, 2);
        })
    };

    mutated.wait();
    assert!(indexer.remove(&cell));
    removed.wait();
    writer.join().unwrap();

    assert!(!indexer.contains(&cell));
    assert!(indexer.values_of("count").unwrap().is_empty());
    assert!(indexer.filter().having("count", 1).unwrap().is_empty());
    assert!(indexer.filter().having("count", 2).unwrap().is_empty());
    assert_eq!(indexer.metrics().snapshot().stale_buckets, 1);
}
