/// Debounce counter of one watcher.
///
/// A poll at or above the threshold after a poll below it is a fresh breach and
/// reports. Sustained breaches report again every `limit` polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ThresholdState {
    consecutive: usize,
    limit: usize,
}

impl ThresholdState {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            consecutive: 0,
            limit: limit.max(1),
        }
    }

    /// Records one poll and returns whether it should trigger a report.
    pub(crate) fn observe(&mut self, breached: bool) -> bool {
        if !breached {
            self.consecutive = 0;
            return false;
        }

        let fresh = self.consecutive == 0;
        self.consecutive += 1;
        if self.consecutive >= self.limit {
            self.consecutive = 0;
        }
        fresh
    }

    #[cfg(test)]
    pub(crate) fn consecutive(&self) -> usize {
        self.consecutive
    }
}
