//! Chunked annotation of an imported record set.
//!
//! A [`Pipeline`] is a state machine: each call to [`Pipeline::step`]
//! annotates one contiguous chunk of records and returns the progress made.
//! The caller regains control between chunks, which is where a host loop
//! can redraw, poll input or cancel the import. A chunk is never split.

use std::sync::Arc;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::error::PipelineError;
use crate::granularity::Granularity;
use crate::granularity::TruncationMode;
use crate::normalize::DistinctValues;
use crate::normalize::Normalizer;
use crate::normalize::Warnings;
use crate::options::ImportOptions;
use crate::read::RecordBatch;
use crate::record::Record;
use crate::spatial::SpatialIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.processed == self.total
    }
}

/// The annotated records of one import.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub(crate) records: Vec<Record>,
    pub(crate) mimes: DistinctValues,
    pub(crate) rtypes: DistinctValues,
    pub(crate) warnings: Warnings,
    pub(crate) granularity: Granularity,
    pub(crate) truncation: TruncationMode,
}

impl Dataset {
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Distinct content types of the timed records, in discovery order.
    pub fn mimes(&self) -> &DistinctValues {
        &self.mimes
    }

    /// Distinct resource types of the timed records, in discovery order.
    pub fn rtypes(&self) -> &DistinctValues {
        &self.rtypes
    }

    pub fn warnings(&self) -> &Warnings {
        &self.warnings
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn truncation(&self) -> TruncationMode {
        self.truncation
    }
}

#[derive(Debug)]
pub struct Pipeline {
    records: Vec<Record>,
    processed: usize,
    options: ImportOptions,
    normalizer: Normalizer,
    malformed_rows: u64,
}

impl Pipeline {
    pub fn new(
        records: Vec<Record>,
        options: ImportOptions,
        spatial: Option<Arc<SpatialIndex>>,
    ) -> Pipeline {
        let options = options.with_chunk_size(options.chunk_size);

        Self {
            records,
            processed: 0,
            options,
            normalizer: Normalizer::new(options, spatial),
            malformed_rows: 0,
        }
    }

    /// Starts a pipeline over the rows of a file, carrying over the number
    /// of rows the reader had to skip.
    pub fn from_batch(
        batch: RecordBatch,
        options: ImportOptions,
        spatial: Option<Arc<SpatialIndex>>,
    ) -> Pipeline {
        let mut pipeline = Self::new(batch.records, options, spatial);
        pipeline.malformed_rows = batch.malformed;
        pipeline
    }

    pub fn progress(&self) -> Progress {
        Progress {
            processed: self.processed,
            total: self.records.len(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.processed == self.records.len()
    }

    /// Annotates the next chunk of records.
    ///
    /// Returns `None` once every record has been processed.
    pub fn step(&mut self) -> Option<Progress> {
        if self.is_done() {
            return None;
        }

        let start = self.processed;
        let end = (start + self.options.chunk_size).min(self.records.len());

        for record in &mut self.records[start..end] {
            self.normalizer.normalize(record);
        }

        self.processed = end;
        let progress = self.progress();
        debug!(
            processed = progress.processed,
            total = progress.total,
            "processed chunk"
        );

        Some(progress)
    }

    /// Drives the pipeline to completion, reporting progress after every
    /// chunk, then hands the dataset to `on_complete`.
    pub fn run<P, C, T>(mut self, mut on_progress: P, on_complete: C) -> T
    where
        P: FnMut(Progress),
        C: FnOnce(Dataset) -> T,
    {
        while let Some(progress) = self.step() {
            on_progress(progress);
        }

        on_complete(self.into_dataset())
    }

    /// The annotated dataset, available once every chunk was processed.
    pub fn finish(self) -> Result<Dataset, PipelineError> {
        if !self.is_done() {
            let Progress { processed, total } = self.progress();
            return Err(PipelineError::Incomplete { processed, total });
        }

        Ok(self.into_dataset())
    }

    /// Stops the pipeline and discards its records.
    pub fn cancel(self) -> Progress {
        let progress = self.progress();
        warn!(
            processed = progress.processed,
            total = progress.total,
            "cancelled import"
        );
        progress
    }

    fn into_dataset(self) -> Dataset {
        let observations = self.normalizer.finish();
        let mut warnings = observations.warnings;
        warnings.malformed_rows += self.malformed_rows;

        info!(
            records = self.records.len(),
            granularity = %self.options.granularity,
            warnings = warnings.total(),
            "import complete"
        );

        Dataset {
            records: self.records,
            mimes: observations.mimes,
            rtypes: observations.rtypes,
            warnings,
            granularity: self.options.granularity,
            truncation: self.options.truncation,
        }
    }
}

impl Iterator for Pipeline {
    type Item = Progress;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.step()
    }
}
