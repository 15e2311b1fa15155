use crate::granularity::Granularity;
use crate::granularity::TruncationMode;

/// Records processed between two yields of an import pipeline.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Largest squared distance between a record and a reference point for the
/// record to be assigned to that point's region.
pub const DEFAULT_MAX_DISTANCE: f64 = 0.1;

/// Settings that apply to a single import.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportOptions {
    pub granularity: Granularity,
    pub truncation: TruncationMode,
    pub chunk_size: usize,
    pub max_distance: f64,
}

impl ImportOptions {
    pub fn new(granularity: Granularity) -> ImportOptions {
        Self {
            granularity,
            ..Self::default()
        }
    }

    pub fn with_truncation(mut self, truncation: TruncationMode) -> ImportOptions {
        self.truncation = truncation;
        self
    }

    /// A chunk size of zero is treated as one.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> ImportOptions {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_max_distance(mut self, max_distance: f64) -> ImportOptions {
        self.max_distance = max_distance;
        self
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            granularity: Granularity::default(),
            truncation: TruncationMode::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_distance: DEFAULT_MAX_DISTANCE,
        }
    }
}
