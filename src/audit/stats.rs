//! Per-Group Statistics
//!
//! [`StatsAggregator`] owns the group map and folds each sampled key into
//! the [`KeyStats`] of its group. Groups are kept in creation order, which
//! is also the order the classifier scans them in.

use crate::audit::classifier::GroupId;
use crate::metadata::KeyRecord;
use hashlink::{LinkedHashMap, LinkedHashSet};

/// Maximum number of example keys remembered per group
pub const MAX_SAMPLE_KEYS: usize = 10;

/// Running totals for one key group.
#[derive(Debug, Clone, Default)]
pub struct KeyStats {
    pub total_instances: u64,
    pub total_idle_time: u64,
    pub total_serialized_length: u64,
    /// Keys folded in that had a TTL
    pub total_expirys_set: u64,

    pub min_serialized_length: Option<u64>,
    pub max_serialized_length: Option<u64>,
    pub min_idle_time: Option<u64>,
    pub max_idle_time: Option<u64>,
    pub max_ttl: Option<u64>,

    /// First keys seen, capped at [`MAX_SAMPLE_KEYS`]
    pub sample_keys: LinkedHashSet<String>,
}

impl KeyStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one key's metadata to the totals.
    pub fn add_stats_for_key(&mut self, record: &KeyRecord) {
        self.total_instances += 1;
        self.total_idle_time += record.idle_seconds;
        self.total_serialized_length += record.serialized_length;

        self.min_idle_time = Some(min_of(self.min_idle_time, record.idle_seconds));
        self.max_idle_time = Some(max_of(self.max_idle_time, record.idle_seconds));
        self.min_serialized_length =
            Some(min_of(self.min_serialized_length, record.serialized_length));
        self.max_serialized_length =
            Some(max_of(self.max_serialized_length, record.serialized_length));

        if let Some(ttl) = record.ttl_seconds {
            self.total_expirys_set += 1;
            self.max_ttl = Some(max_of(self.max_ttl, ttl));
        }

        if self.sample_keys.len() < MAX_SAMPLE_KEYS {
            self.sample_keys.insert(record.key.clone());
        }
    }

    /// Share of keys in this group that have a TTL, in `[0, 1]`.
    pub fn expiry_proportion(&self) -> f64 {
        ratio(self.total_expirys_set, self.total_instances)
    }

    /// Mean idle time in whole seconds.
    pub fn average_idle_time(&self) -> u64 {
        self.total_idle_time
            .checked_div(self.total_instances)
            .unwrap_or(0)
    }

    /// The first example key recorded.
    pub fn first_sample_key(&self) -> Option<&str> {
        self.sample_keys.front().map(String::as_str)
    }
}

fn min_of(current: Option<u64>, value: u64) -> u64 {
    current.map_or(value, |c| c.min(value))
}

fn max_of(current: Option<u64>, value: u64) -> u64 {
    current.map_or(value, |c| c.max(value))
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Map from group to its running statistics.
#[derive(Debug, Clone, Default)]
pub struct StatsAggregator {
    groups: LinkedHashMap<GroupId, KeyStats>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds `record` into `group`, creating the group on first use.
    pub fn fold(&mut self, group: GroupId, record: &KeyRecord) {
        self.groups
            .entry(group)
            .or_insert_with(KeyStats::new)
            .add_stats_for_key(record);
    }

    /// Known groups, oldest first.
    pub fn group_ids(&self) -> impl Iterator<Item = &GroupId> {
        self.groups.keys()
    }

    /// All groups with their stats, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (&GroupId, &KeyStats)> {
        self.groups.iter()
    }

    pub fn get(&self, group: &GroupId) -> Option<&KeyStats> {
        self.groups.get(group)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Serialized bytes across every group.
    pub fn total_serialized_length(&self) -> u64 {
        self.groups
            .values()
            .map(|stats| stats.total_serialized_length)
            .sum()
    }

    /// Keys folded across every group.
    pub fn total_instances(&self) -> u64 {
        self.groups.values().map(|stats| stats.total_instances).sum()
    }

    /// Share of all sampled bytes held by `stats`, in `[0, 1]`.
    /// Zero when nothing has been sampled.
    pub fn memory_proportion(&self, stats: &KeyStats) -> f64 {
        ratio(
            stats.total_serialized_length,
            self.total_serialized_length(),
        )
    }

    /// Groups ordered by ascending serialized length; equal sizes keep
    /// creation order.
    pub fn by_serialized_length(&self) -> Vec<(&GroupId, &KeyStats)> {
        let mut sorted: Vec<_> = self.groups.iter().collect();
        sorted.sort_by_key(|(_, stats)| stats.total_serialized_length);
        sorted
    }
}
