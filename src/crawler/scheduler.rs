//! Task definitions and static partitioning
//!
//! This module handles:
//! - The task record a worker executes, and its phase tag
//! - Per-worker private priority queues
//! - Round-robin partitioning of a phase's tasks across workers

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;

/// What a task asks the owning source to do
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaskPayload {
    /// Build the source's candidate URL list
    ListFetch,
    /// Fetch and extract one article
    ContentFetch(String),
    /// Run the source's batch-processing entry point
    ProcessData,
}

impl TaskPayload {
    pub fn kind(&self) -> TaskKind {
        match self {
            Self::ListFetch => TaskKind::Discover,
            Self::ContentFetch(_) => TaskKind::Fetch,
            Self::ProcessData => TaskKind::Process,
        }
    }
}

/// The phase a worker serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Discover,
    Fetch,
    Process,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discover => "discover",
            Self::Fetch => "fetch",
            Self::Process => "process",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A unit of work for one source
#[derive(Debug, Clone)]
pub struct Task {
    /// Lower values run first
    pub priority: u64,
    pub source: String,
    pub payload: TaskPayload,
}

// Lower priority values have higher priority (are popped first from BinaryHeap)
impl Ord for Task {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.source.cmp(&self.source))
            .then_with(|| other.payload.cmp(&self.payload))
    }
}

impl PartialOrd for Task {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Task {}

/// A worker's private task queue
#[derive(Debug, Default)]
pub struct TaskQueue {
    heap: BinaryHeap<Task>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: Task) {
        self.heap.push(task);
    }

    /// Removes the task with the lowest priority value
    pub fn pop(&mut self) -> Option<Task> {
        self.heap.pop()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// Splits a phase's tasks across `workers` private queues
///
/// Task `i` goes to queue `i % workers`, so consecutive tasks of one source
/// land on different workers. Priorities count up per source in input order.
///
/// # Arguments
///
/// * `tasks` - `(source, payload)` pairs in the order they were produced
/// * `workers` - Number of queues to create (at least one is always returned)
pub fn partition_round_robin(tasks: Vec<(String, TaskPayload)>, workers: usize) -> Vec<TaskQueue> {
    let workers = workers.max(1);
    let mut queues: Vec<TaskQueue> = (0..workers).map(|_| TaskQueue::new()).collect();
    let mut counters: HashMap<String, u64> = HashMap::new();

    for (index, (source, payload)) in tasks.into_iter().enumerate() {
        let counter = counters.entry(source.clone()).or_insert(0);
        let priority = *counter;
        *counter += 1;

        queues[index % workers].push(Task {
            priority,
            source,
            payload,
        });
    }

    queues
}
