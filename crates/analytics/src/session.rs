use std::sync::Arc;

use tracing::info;
use tracing::warn;

use crate::cube::Cube;
use crate::granularity::Granularity;
use crate::normalize::DistinctValues;
use crate::normalize::Warnings;
use crate::options::ImportOptions;
use crate::pipeline::Dataset;
use crate::pipeline::Pipeline;
use crate::pipeline::Progress;
use crate::read::RecordBatch;
use crate::spatial::SpatialIndex;

/// The state built from one completed import.
#[derive(Debug, Clone)]
pub struct Session {
    cube: Cube,
    mimes: DistinctValues,
    rtypes: DistinctValues,
    warnings: Warnings,
    granularity: Granularity,
}

impl Session {
    pub fn new(dataset: Dataset) -> Session {
        let Dataset {
            records,
            mimes,
            rtypes,
            warnings,
            granularity,
            ..
        } = dataset;

        if !warnings.is_empty() {
            warn!(
                malformed_rows = warnings.malformed_rows,
                missing_time = warnings.missing_time,
                invalid_time = warnings.invalid_time,
                invalid_coordinates = warnings.invalid_coordinates,
                region_misses = warnings.region_misses,
                "import completed with warnings"
            );
        }

        Self {
            cube: Cube::new(records),
            mimes,
            rtypes,
            warnings,
            granularity,
        }
    }

    pub fn cube(&self) -> &Cube {
        &self.cube
    }

    pub fn cube_mut(&mut self) -> &mut Cube {
        &mut self.cube
    }

    pub fn distinct_mimes(&self) -> &DistinctValues {
        &self.mimes
    }

    pub fn distinct_rtypes(&self) -> &DistinctValues {
        &self.rtypes
    }

    pub fn warnings(&self) -> &Warnings {
        &self.warnings
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }
}

/// Sequences imports against a shared spatial index.
///
/// At most one pipeline runs at a time: starting an import cancels the one
/// in flight, and the current session is only replaced once the new
/// pipeline has processed every record.
#[derive(Debug)]
pub struct Workbench {
    options: ImportOptions,
    spatial: Option<Arc<SpatialIndex>>,
    pipeline: Option<Pipeline>,
    session: Option<Session>,
}

impl Workbench {
    pub fn new(options: ImportOptions, spatial: Option<SpatialIndex>) -> Workbench {
        Self {
            options,
            spatial: spatial.map(Arc::new),
            pipeline: None,
            session: None,
        }
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    pub fn spatial(&self) -> Option<&SpatialIndex> {
        self.spatial.as_deref()
    }

    /// Starts importing `batch`, cancelling any import still in flight.
    pub fn begin_import(&mut self, batch: RecordBatch) {
        self.cancel();

        info!(records = batch.records.len(), "starting import");
        self.pipeline = Some(Pipeline::from_batch(
            batch,
            self.options,
            self.spatial.clone(),
        ));
    }

    pub fn is_importing(&self) -> bool {
        self.pipeline.is_some()
    }

    /// Processes the next chunk of the running import.
    ///
    /// Once the last chunk is processed the import's session becomes the
    /// current one. Returns `None` when there is nothing left to do.
    pub fn step(&mut self) -> Option<Progress> {
        let pipeline = self.pipeline.as_mut()?;
        let progress = pipeline.step();

        if pipeline.is_done() {
            self.complete();
        }

        progress
    }

    /// Cancels the running import, keeping the current session.
    pub fn cancel(&mut self) -> Option<Progress> {
        self.pipeline.take().map(Pipeline::cancel)
    }

    /// Imports `batch` to completion and returns the new session.
    pub fn import<F>(&mut self, batch: RecordBatch, on_progress: F) -> &mut Session
    where
        F: FnMut(Progress),
    {
        self.cancel();

        let pipeline = Pipeline::from_batch(batch, self.options, self.spatial.clone());
        let session = pipeline.run(on_progress, Session::new);

        self.session.insert(session)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    fn complete(&mut self) {
        let Some(pipeline) = self.pipeline.take() else {
            return;
        };

        match pipeline.finish() {
            Ok(dataset) => self.session = Some(Session::new(dataset)),
            Err(error) => warn!(%error, "discarding unfinished import"),
        }
    }
}
