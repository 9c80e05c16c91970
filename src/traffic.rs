// In-memory interface counter history: per (target, ifIndex) FIFO of the last `window`
// samples. Process-lifetime only; a restarted session starts empty.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::{CounterSample, InterfaceIndex, Target};

pub const DEFAULT_WINDOW: usize = 10;

type SeriesMap = HashMap<Target, BTreeMap<InterfaceIndex, VecDeque<CounterSample>>>;

pub struct TrafficSeries {
    window: usize,
    series: RwLock<SeriesMap>,
}

impl Default for TrafficSeries {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl TrafficSeries {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            series: RwLock::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    // Every write leaves the map consistent, so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, SeriesMap> {
        self.series.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SeriesMap> {
        self.series.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Append one sample, evicting the oldest once the window is full.
    pub fn append(&self, target: &Target, index: InterfaceIndex, sample: CounterSample) {
        let mut map = self.write();
        let ring = map
            .entry(target.clone())
            .or_default()
            .entry(index)
            .or_insert_with(|| VecDeque::with_capacity(self.window));
        while ring.len() >= self.window {
            ring.pop_front();
        }
        ring.push_back(sample);
    }

    /// Samples for one interface, oldest first. Empty if the interface is unknown.
    pub fn snapshot(&self, target: &Target, index: InterfaceIndex) -> Vec<CounterSample> {
        self.read()
            .get(target)
            .and_then(|by_index| by_index.get(&index))
            .map(|ring| ring.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn known_indices(&self, target: &Target) -> BTreeSet<InterfaceIndex> {
        self.read()
            .get(target)
            .map(|by_index| by_index.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Targets with at least one tracked interface, sorted.
    pub fn targets(&self) -> Vec<Target> {
        let mut out: Vec<Target> = self
            .read()
            .iter()
            .filter(|(_, by_index)| !by_index.is_empty())
            .map(|(t, _)| t.clone())
            .collect();
        out.sort();
        out
    }

    /// Start tracking freshly discovered interfaces (with empty history). With `prune_stale`,
    /// interfaces missing from `discovered` are dropped; an empty `discovered` never prunes.
    /// Returns the number of series dropped.
    pub fn track_indices(
        &self,
        target: &Target,
        discovered: &[InterfaceIndex],
        prune_stale: bool,
    ) -> usize {
        if discovered.is_empty() {
            return 0;
        }
        let mut map = self.write();
        let by_index = map.entry(target.clone()).or_default();
        let mut removed = 0;
        if prune_stale {
            let before = by_index.len();
            by_index.retain(|index, _| discovered.contains(index));
            removed = before - by_index.len();
        }
        for &index in discovered {
            by_index
                .entry(index)
                .or_insert_with(|| VecDeque::with_capacity(self.window));
        }
        removed
    }

    /// Forget everything about one target.
    pub fn remove_target(&self, target: &Target) -> bool {
        self.write().remove(target).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ts: i64) -> CounterSample {
        CounterSample {
            timestamp: ts,
            received_octets: ts as u64 * 10,
            sent_octets: ts as u64 * 20,
        }
    }

    #[test]
    fn window_of_one_keeps_latest() {
        let series = TrafficSeries::new(1);
        let t = Target::new("10.0.0.1", 161);
        series.append(&t, 2, sample(1));
        series.append(&t, 2, sample(2));
        assert_eq!(series.snapshot(&t, 2), vec![sample(2)]);
    }

    #[test]
    fn zero_window_is_clamped() {
        assert_eq!(TrafficSeries::new(0).window(), 1);
    }
}
