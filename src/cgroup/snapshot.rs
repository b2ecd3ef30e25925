use std::collections::VecDeque;
use std::time::Instant;

/// Default number of retained snapshots; 24 polls at the default 5s interval
/// spans two minutes.
pub const DEFAULT_SNAPSHOT_CAPACITY: usize = 24;

/// Cumulative CPU usage observed at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageSnapshot {
    /// CPU time consumed since an arbitrary origin, in nanoseconds.
    pub usage: u64,
    pub timestamp: Instant,
}

/// Fixed-capacity FIFO of [`UsageSnapshot`]s, oldest first.
///
/// Once `capacity` snapshots have been enqueued the queue stays full: every
/// further insert evicts exactly the oldest element.
#[derive(Debug)]
pub struct SnapshotQueue {
    snapshots: VecDeque<UsageSnapshot>,
    capacity: usize,
    full: bool,
}

impl SnapshotQueue {
    /// Creates an empty queue. A `capacity` of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            snapshots: VecDeque::with_capacity(capacity),
            capacity,
            full: false,
        }
    }

    pub fn enqueue(&mut self, snapshot: UsageSnapshot) {
        if self.snapshots.len() == self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snapshot);
        if self.snapshots.len() == self.capacity {
            self.full = true;
        }
    }

    /// Whether the queue has reached its capacity at least once.
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// The oldest retained snapshot.
    pub fn head(&self) -> Option<&UsageSnapshot> {
        self.snapshots.front()
    }

    /// The most recently enqueued snapshot.
    pub fn tail(&self) -> Option<&UsageSnapshot> {
        self.snapshots.back()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// CPU time consumed per unit of wall time between head and tail.
    ///
    /// Returns `None` until the queue is full. A counter that went backwards
    /// or a zero-length window yields `0.0`.
    pub fn rate(&self) -> Option<f64> {
        if !self.full {
            return None;
        }
        let (head, tail) = (self.head()?, self.tail()?);
        let delta = tail.usage.saturating_sub(head.usage);
        let elapsed = tail.timestamp.saturating_duration_since(head.timestamp);
        if elapsed.is_zero() {
            return Some(0.0);
        }
        Some(delta as f64 / elapsed.as_nanos() as f64)
    }
}
