use std::collections::VecDeque;

use chrono::{DateTime, Utc};

/// A recorded metric together with the time it was recorded at.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample<T> {
    pub at: DateTime<Utc>,
    pub metric: T,
}

/// Time-ordered queue of samples bounded by a retention horizon.
/// Samples are only ever appended (or slotted in by time) and pruned from
/// the front, never mutated.
#[derive(Debug, Clone)]
pub struct MetricHistory<T> {
    samples: VecDeque<Sample<T>>,
}

impl<T> Default for MetricHistory<T> {
    fn default() -> Self {
        Self {
            samples: VecDeque::new(),
        }
    }
}

impl<T> MetricHistory<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts keeping time order, then drops everything older than `horizon`.
    /// A sample that is already past the horizon is never stored.
    pub fn record(&mut self, at: DateTime<Utc>, metric: T, horizon: DateTime<Utc>) {
        if at >= horizon {
            match self.samples.back() {
                Some(last) if last.at > at => {
                    let idx = self.samples.partition_point(|s| s.at <= at);
                    self.samples.insert(idx, Sample { at, metric });
                }
                _ => self.samples.push_back(Sample { at, metric }),
            }
        }
        self.prune(horizon);
    }

    /// Prefix trim: samples strictly older than `horizon` go.
    pub fn prune(&mut self, horizon: DateTime<Utc>) -> usize {
        let stale = self.samples.partition_point(|s| s.at < horizon);
        self.samples.drain(..stale);
        stale
    }

    /// Samples recorded at or after `since`, oldest first.
    pub fn since(&self, since: DateTime<Utc>) -> impl Iterator<Item = &Sample<T>> {
        let start = self.samples.partition_point(|s| s.at < since);
        self.samples.range(start..)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
