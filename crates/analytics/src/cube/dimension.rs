use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::cube::Dimension;
use crate::cube::Filter;
use crate::cube::Key;
use crate::record::Record;

/// The records of one dimension grouped by key.
///
/// Keys are stored once, sorted in their natural order, so a key id orders
/// the same way as its key. Record ids are laid out key after key in
/// `members`, with `offsets[k]..offsets[k + 1]` delimiting the records of
/// key `k`.
#[derive(Debug, Clone)]
pub(crate) struct DimensionIndex {
    keys: Vec<Key>,
    discovery: Vec<usize>,
    record_keys: Vec<Option<u32>>,
    offsets: Vec<usize>,
    members: Vec<u32>,
    unkeyed: Vec<u32>,
    selection: Option<Vec<bool>>,
}

impl DimensionIndex {
    pub(crate) fn build(dimension: Dimension, records: &[Record]) -> DimensionIndex {
        let mut first_seen: HashMap<Key, usize> = HashMap::new();
        let mut projected: Vec<Option<Key>> = Vec::with_capacity(records.len());

        for record in records {
            let key = dimension.project(record);
            if let Some(ref key) = key {
                let rank = first_seen.len();
                if let Entry::Vacant(entry) = first_seen.entry(key.clone()) {
                    entry.insert(rank);
                }
            }
            projected.push(key);
        }

        let mut keys: Vec<Key> = first_seen.keys().cloned().collect();
        keys.sort_unstable();

        let discovery: Vec<usize> = keys.iter().map(|key| first_seen[key]).collect();
        let ids: HashMap<&Key, u32> = keys
            .iter()
            .enumerate()
            .map(|(id, key)| (key, id as u32))
            .collect();

        let record_keys: Vec<Option<u32>> = projected
            .iter()
            .map(|key| key.as_ref().map(|key| ids[key]))
            .collect();

        let mut offsets = vec![0usize; keys.len() + 1];
        for key in record_keys.iter().flatten() {
            offsets[*key as usize + 1] += 1;
        }
        for k in 0..keys.len() {
            offsets[k + 1] += offsets[k];
        }

        let mut cursor = offsets.clone();
        let mut members = vec![0u32; offsets[keys.len()]];
        let mut unkeyed = Vec::new();
        for (record, key) in record_keys.iter().enumerate() {
            match key {
                Some(key) => {
                    let slot = &mut cursor[*key as usize];
                    members[*slot] = record as u32;
                    *slot += 1;
                }
                None => unkeyed.push(record as u32),
            }
        }

        Self {
            keys,
            discovery,
            record_keys,
            offsets,
            members,
            unkeyed,
            selection: None,
        }
    }

    pub(crate) fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub(crate) fn key_of(&self, record: usize) -> Option<u32> {
        self.record_keys[record]
    }

    pub(crate) fn discovery(&self, key: u32) -> usize {
        self.discovery[key as usize]
    }

    pub(crate) fn members(&self, key: u32) -> &[u32] {
        let key = key as usize;
        &self.members[self.offsets[key]..self.offsets[key + 1]]
    }

    pub(crate) fn is_filtered(&self) -> bool {
        self.selection.is_some()
    }

    /// The keys a filter selects, as a flag per key id.
    pub(crate) fn select(&self, filter: &Filter) -> Vec<bool> {
        let mut selection = vec![false; self.keys.len()];

        match filter {
            Filter::Exact(key) => {
                if let Ok(id) = self.keys.binary_search(key) {
                    selection[id] = true;
                }
            }
            Filter::Range(low, high) => {
                let start = self.keys.partition_point(|key| key < low);
                let end = self.keys.partition_point(|key| key < high).max(start);
                selection[start..end].fill(true);
            }
            Filter::Set(keys) => {
                for key in keys {
                    if let Ok(id) = self.keys.binary_search(key) {
                        selection[id] = true;
                    }
                }
            }
        }

        selection
    }

    /// Installs a new selection (`None` clears the filter) and returns the
    /// records whose membership in the filtered subset flipped.
    pub(crate) fn replace_selection(&mut self, selection: Option<Vec<bool>>) -> Vec<u32> {
        let previous = std::mem::replace(&mut self.selection, selection);
        let mut changed = Vec::new();

        match (&previous, &self.selection) {
            (None, None) => {}
            (None, Some(current)) | (Some(current), None) => {
                for (key, selected) in current.iter().enumerate() {
                    if !selected {
                        changed.extend_from_slice(self.members(key as u32));
                    }
                }
                changed.extend_from_slice(&self.unkeyed);
            }
            (Some(previous), Some(current)) => {
                for (key, (was, is)) in previous.iter().zip(current).enumerate() {
                    if was != is {
                        changed.extend_from_slice(self.members(key as u32));
                    }
                }
            }
        }

        changed
    }
}
