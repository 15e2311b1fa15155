use std::ops::AddAssign;
use std::sync::Arc;

use indexmap::IndexSet;
use serde::Serialize;

use crate::options::ImportOptions;
use crate::record::Coordinates;
use crate::record::Record;
use crate::spatial::SpatialIndex;

/// Counts of the problems that were tolerated during an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Warnings {
    /// Rows that could not be decoded and were skipped.
    pub malformed_rows: u64,

    /// Records without any usable time column.
    pub missing_time: u64,

    /// Time columns that were present but could not be parsed.
    pub invalid_time: u64,

    /// Records whose geographic columns are not numbers.
    pub invalid_coordinates: u64,

    /// Records with coordinates but no reference point within range.
    pub region_misses: u64,
}

impl Warnings {
    pub fn total(&self) -> u64 {
        self.malformed_rows
            + self.missing_time
            + self.invalid_time
            + self.invalid_coordinates
            + self.region_misses
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl AddAssign for Warnings {
    fn add_assign(&mut self, other: Warnings) {
        self.malformed_rows += other.malformed_rows;
        self.missing_time += other.missing_time;
        self.invalid_time += other.invalid_time;
        self.invalid_coordinates += other.invalid_coordinates;
        self.region_misses += other.region_misses;
    }
}

/// Distinct values of a column in the order they were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistinctValues {
    values: IndexSet<Arc<str>>,
}

impl DistinctValues {
    pub fn insert(&mut self, value: &str) {
        if !self.values.contains(value) {
            self.values.insert(Arc::from(value));
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values.contains(value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|value| &**value)
    }
}

impl Serialize for DistinctValues {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// Annotates records with their time bucket and region.
#[derive(Debug)]
pub struct Normalizer {
    options: ImportOptions,
    spatial: Option<Arc<SpatialIndex>>,
    mimes: DistinctValues,
    rtypes: DistinctValues,
    warnings: Warnings,
}

/// What a [`Normalizer`] collected while annotating records.
#[derive(Debug, Clone, Default)]
pub struct Observations {
    pub mimes: DistinctValues,
    pub rtypes: DistinctValues,
    pub warnings: Warnings,
}

impl Normalizer {
    pub fn new(options: ImportOptions, spatial: Option<Arc<SpatialIndex>>) -> Normalizer {
        Self {
            options,
            spatial,
            mimes: DistinctValues::default(),
            rtypes: DistinctValues::default(),
            warnings: Warnings::default(),
        }
    }

    /// Sets the bucketed time and region of `record`.
    ///
    /// Content and resource types are only collected from records that have
    /// a time, since they name the series of the time dimension.
    pub fn normalize(&mut self, record: &mut Record) {
        let parsed = record.parse_time();
        self.warnings.invalid_time += u64::from(parsed.invalid);

        record.bucketed_time = parsed.time.and_then(|(time, _)| {
            let bucket = self
                .options
                .granularity
                .truncate(time, self.options.truncation);
            if bucket.is_none() {
                self.warnings.invalid_time += 1;
            }
            bucket
        });

        if record.bucketed_time.is_some() {
            if let Some(mime) = record.mime() {
                self.mimes.insert(mime);
            }
            if let Some(rtype) = record.rtype() {
                self.rtypes.insert(rtype);
            }
        } else {
            self.warnings.missing_time += 1;
        }

        record.region = self.locate(record);
    }

    fn locate(&mut self, record: &Record) -> Option<Arc<str>> {
        let spatial = self.spatial.as_ref()?;

        match record.coordinates() {
            Coordinates::Absent => None,
            Coordinates::Invalid => {
                self.warnings.invalid_coordinates += 1;
                None
            }
            Coordinates::Valid {
                latitude,
                longitude,
            } => {
                let region = spatial
                    .nearest_region(latitude, longitude, self.options.max_distance)
                    .map(|point| Arc::clone(&point.name));

                if region.is_none() {
                    self.warnings.region_misses += 1;
                }

                region
            }
        }
    }

    pub fn finish(self) -> Observations {
        Observations {
            mimes: self.mimes,
            rtypes: self.rtypes,
            warnings: self.warnings,
        }
    }
}
