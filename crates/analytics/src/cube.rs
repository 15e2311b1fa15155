//! Multi-dimensional counting over an imported dataset.
//!
//! A [`Cube`] indexes every record along each [`Dimension`] and keeps one
//! count per key for every registered group. Filters are applied per
//! dimension: a group over dimension `d` counts the records that pass the
//! filters of every dimension except `d`, so a chart never filters itself.
//! Changing a filter only revisits the records whose membership changed.

mod dimension;
mod group;

use std::cmp::Reverse;
use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;
use std::sync::Arc;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::record::Record;

use self::dimension::DimensionIndex;
use self::group::Group;

pub use self::group::Bucket;
pub use self::group::Condition;
pub use self::group::GroupId;

/// An axis along which records are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Time,
    Platform,
    ContentType,
    ResourceType,
    Region,
    Title,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Time,
        Dimension::Platform,
        Dimension::ContentType,
        Dimension::ResourceType,
        Dimension::Region,
        Dimension::Title,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Dimension::Time => "time",
            Dimension::Platform => "platform",
            Dimension::ContentType => "content_type",
            Dimension::ResourceType => "resource_type",
            Dimension::Region => "region",
            Dimension::Title => "title",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    fn bit(self) -> u8 {
        1 << self.index()
    }

    /// The key of `record` along this dimension.
    pub fn project(self, record: &Record) -> Option<Key> {
        match self {
            Dimension::Time => record.bucketed_time.map(Key::Time),
            Dimension::Platform => record.platform().map(Key::from),
            Dimension::ContentType => record.mime().map(Key::from),
            Dimension::ResourceType => record.rtype().map(Key::from),
            Dimension::Region => record.region.clone().map(Key::Text),
            Dimension::Title => record.publication_title().map(Key::from),
        }
    }
}

impl Display for Dimension {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value along a dimension: a time bucket or a text value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum Key {
    Time(DateTime<Utc>),
    Text(Arc<str>),
}

impl Key {
    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Key::Time(time) => Some(*time),
            Key::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Key::Time(_) => None,
            Key::Text(text) => Some(text),
        }
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Key::Time(time) => write!(f, "{}", time.to_rfc3339()),
            Key::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Text(Arc::from(value))
    }
}

impl From<DateTime<Utc>> for Key {
    fn from(value: DateTime<Utc>) -> Self {
        Key::Time(value)
    }
}

/// Selects the keys of a dimension.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Exact(Key),

    /// Keys in `[low, high)`.
    Range(Key, Key),

    Set(Vec<Key>),
}

impl Filter {
    pub fn exact(key: impl Into<Key>) -> Filter {
        Filter::Exact(key.into())
    }

    pub fn range(low: impl Into<Key>, high: impl Into<Key>) -> Filter {
        Filter::Range(low.into(), high.into())
    }
}

/// The span of the time dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeExtent {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,

    /// Set when no record has a time and the span defaults to one day
    /// from now.
    pub fallback: bool,
}

#[derive(Debug, Clone)]
pub struct Cube {
    records: Vec<Record>,
    dimensions: Vec<DimensionIndex>,

    /// One bit per filtered dimension that rejects the record.
    masks: Vec<u8>,
    groups: Vec<Group>,
    selected: usize,
}

impl Cube {
    pub fn new(records: Vec<Record>) -> Cube {
        let dimensions: Vec<DimensionIndex> = Dimension::ALL
            .iter()
            .map(|dimension| DimensionIndex::build(*dimension, &records))
            .collect();

        let mut cube = Self {
            masks: vec![0; records.len()],
            selected: records.len(),
            records,
            dimensions,
            groups: Vec::new(),
        };

        for dimension in Dimension::ALL {
            cube.register_group(dimension, None);
        }

        debug!(records = cube.len(), "built cube");

        cube
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// The distinct keys of a dimension in ascending order.
    pub fn keys(&self, dimension: Dimension) -> &[Key] {
        self.index(dimension).keys()
    }

    /// The smallest and largest key of a dimension.
    pub fn extent(&self, dimension: Dimension) -> Option<(&Key, &Key)> {
        let keys = self.keys(dimension);
        Some((keys.first()?, keys.last()?))
    }

    pub fn time_extent(&self) -> TimeExtent {
        self.time_extent_at(Utc::now())
    }

    /// The span of the time dimension, or `now` to `now + 1 day` when no
    /// record has a time.
    pub fn time_extent_at(&self, now: DateTime<Utc>) -> TimeExtent {
        let extent = self
            .extent(Dimension::Time)
            .and_then(|(start, end)| Some((start.as_time()?, end.as_time()?)));

        match extent {
            Some((start, end)) => TimeExtent {
                start,
                end,
                fallback: false,
            },
            None => TimeExtent {
                start: now,
                end: now + Duration::days(1),
                fallback: true,
            },
        }
    }

    /// Counts the records per key of `dimension` under the current filters
    /// of the other dimensions, optionally restricted by `condition`.
    ///
    /// Every key is returned, in ascending order, including keys whose
    /// count is zero.
    pub fn group_by(&self, dimension: Dimension, condition: Option<&Condition>) -> Vec<Bucket> {
        let counts = self.scan(dimension, condition);
        self.buckets(dimension, &counts)
    }

    /// Registers a group whose counts are kept up to date as filters change.
    pub fn register_group(&mut self, dimension: Dimension, condition: Option<Condition>) -> GroupId {
        let counts = self.scan(dimension, condition.as_ref());
        self.groups.push(Group {
            dimension,
            condition,
            counts,
        });

        GroupId(self.groups.len() - 1)
    }

    /// The current counts of a registered group, in ascending key order.
    pub fn group(&self, id: GroupId) -> Vec<Bucket> {
        let group = &self.groups[id.0];
        self.buckets(group.dimension, &group.counts)
    }

    /// The unconditional counts of a dimension.
    pub fn counts(&self, dimension: Dimension) -> Vec<Bucket> {
        self.group(GroupId(dimension.index()))
    }

    /// The `n` keys with the highest non-zero count, ties broken by the
    /// order in which the keys first appeared in the dataset.
    pub fn top_n(&self, dimension: Dimension, n: usize) -> Vec<Bucket> {
        let index = self.index(dimension);
        let counts = &self.groups[dimension.index()].counts;

        let mut ranked: Vec<u32> = (0..counts.len() as u32)
            .filter(|key| counts[*key as usize] > 0)
            .collect();
        ranked.sort_by_key(|key| (Reverse(counts[*key as usize]), index.discovery(*key)));
        ranked.truncate(n);

        ranked
            .into_iter()
            .map(|key| Bucket {
                key: index.keys()[key as usize].clone(),
                value: counts[key as usize],
            })
            .collect()
    }

    /// Restricts `dimension` to the keys `filter` selects, replacing any
    /// filter already set on it. Records without a key along `dimension`
    /// are excluded while it is filtered.
    pub fn apply_filter(&mut self, dimension: Dimension, filter: Filter) {
        let selection = self.index(dimension).select(&filter);
        debug!(%dimension, ?filter, "applying filter");
        self.update_selection(dimension, Some(selection));
    }

    pub fn clear_filter(&mut self, dimension: Dimension) {
        debug!(%dimension, "clearing filter");
        self.update_selection(dimension, None);
    }

    pub fn clear_filters(&mut self) {
        for dimension in Dimension::ALL {
            self.clear_filter(dimension);
        }
    }

    pub fn is_filtered(&self, dimension: Dimension) -> bool {
        self.index(dimension).is_filtered()
    }

    /// The number of records that pass every filter.
    pub fn selected_count(&self) -> usize {
        self.selected
    }

    pub fn selected_records(&self) -> impl Iterator<Item = &Record> {
        self.records
            .iter()
            .zip(&self.masks)
            .filter(|(_, mask)| **mask == 0)
            .map(|(record, _)| record)
    }

    fn index(&self, dimension: Dimension) -> &DimensionIndex {
        &self.dimensions[dimension.index()]
    }

    fn scan(&self, dimension: Dimension, condition: Option<&Condition>) -> Vec<u64> {
        let index = self.index(dimension);
        let others = !dimension.bit();
        let mut counts = vec![0u64; index.keys().len()];

        for (position, (record, mask)) in self.records.iter().zip(&self.masks).enumerate() {
            if mask & others != 0 {
                continue;
            }
            if condition.is_some_and(|condition| !condition.matches(record)) {
                continue;
            }
            if let Some(key) = index.key_of(position) {
                counts[key as usize] += 1;
            }
        }

        counts
    }

    fn buckets(&self, dimension: Dimension, counts: &[u64]) -> Vec<Bucket> {
        self.index(dimension)
            .keys()
            .iter()
            .zip(counts)
            .map(|(key, value)| Bucket {
                key: key.clone(),
                value: *value,
            })
            .collect()
    }

    fn update_selection(&mut self, dimension: Dimension, selection: Option<Vec<bool>>) {
        let changed = self.dimensions[dimension.index()].replace_selection(selection);
        let bit = dimension.bit();

        for position in changed {
            let position = position as usize;
            let before = self.masks[position];
            let after = before ^ bit;
            self.masks[position] = after;

            match (before == 0, after == 0) {
                (true, false) => self.selected -= 1,
                (false, true) => self.selected += 1,
                _ => {}
            }

            let record = &self.records[position];
            for group in &mut self.groups {
                let others = !group.dimension.bit();
                let was_visible = before & others == 0;
                let is_visible = after & others == 0;
                if was_visible == is_visible || !group.includes(record) {
                    continue;
                }

                let Some(key) = self.dimensions[group.dimension.index()].key_of(position) else {
                    continue;
                };

                let count = &mut group.counts[key as usize];
                if is_visible {
                    *count += 1;
                } else {
                    *count -= 1;
                }
            }
        }

        debug!(selected = self.selected, "updated selection");
    }
}
