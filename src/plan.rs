//! A priority queue that stores simulation events sorted by time
//!
//! Defines a `Queue<T, P>` that stores items of type `T`, sorted by `f64`
//! time and an orderable priority `P`. These items are called 'plans'. The
//! queue has methods for adding plans and retrieving the earliest plan.
//! Adding and retrieving a plan are both *O*(log(*n*)).
//!
//! There is deliberately no way to cancel a plan: once added, a plan is
//! always returned by `get_next_plan`. Callers that need to supersede earlier
//! work check their own state when the plan fires.
//!
//! This queue is used by `Context` to store future events where some callback
//! closure `FnOnce(&mut Context)` will be executed at a given point in time.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A priority queue that stores arbitrary data sorted by time
///
/// Items of type `T` are stored in order by `f64` time and called `Plan<T>`.
/// Plans have priorities given by some orderable type `P`. Each plan is
/// sequentially assigned a `u64` sequence number when it is added. If two
/// plans are scheduled for the same time then the plan with the lowest
/// priority is placed earlier. If two plans have the same time and priority
/// then the plan that was added first is placed earlier (FIFO).
pub struct Queue<T, P: Eq + PartialEq + Ord> {
    queue: BinaryHeap<Entry<T, P>>,
    plan_counter: u64,
}

impl<T, P: Eq + PartialEq + Ord> Queue<T, P> {
    /// Create a new empty `Queue<T, P>`
    #[must_use]
    pub fn new() -> Queue<T, P> {
        Queue {
            queue: BinaryHeap::new(),
            plan_counter: 0,
        }
    }

    /// Add a plan to the queue at the specified time
    pub fn add_plan(&mut self, time: f64, data: T, priority: P) {
        let sequence = self.plan_counter;
        self.queue.push(Entry {
            time,
            sequence,
            priority,
            data,
        });
        self.plan_counter += 1;
    }

    /// Retrieve the earliest plan in the queue
    ///
    /// Returns the next plan if it exists or else `None` if the queue is empty
    pub fn get_next_plan(&mut self) -> Option<Plan<T>> {
        self.queue.pop().map(|entry| Plan {
            time: entry.time,
            data: entry.data,
        })
    }

    /// The time of the earliest plan, if any
    #[must_use]
    pub fn next_time(&self) -> Option<f64> {
        self.queue.peek().map(|entry| entry.time)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<T, P: Eq + PartialEq + Ord> Default for Queue<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

/// A time, sequence number, priority and payload used to order plans in
/// the `Queue<T, P>`
struct Entry<T, P: Eq + PartialEq + Ord> {
    time: f64,
    sequence: u64,
    priority: P,
    data: T,
}

impl<T, P: Eq + PartialEq + Ord> PartialEq for Entry<T, P> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T, P: Eq + PartialEq + Ord> Eq for Entry<T, P> {}

impl<T, P: Eq + PartialEq + Ord> PartialOrd for Entry<T, P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Earlier time first, then lower priority, then earlier insertion.
/// `BinaryHeap` is a max-heap, so the whole comparison is reversed.
impl<T, P: Eq + PartialEq + Ord> Ord for Entry<T, P> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Times are validated as finite by `Context::add_plan`.
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.priority.cmp(&other.priority))
            .then_with(|| self.sequence.cmp(&other.sequence))
            .reverse()
    }
}

/// A plan that holds data of type `T` intended to be used at the specified time
pub struct Plan<T> {
    pub time: f64,
    pub data: T,
}
