use std::path::Path;
use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;
use logcube_analytics::ImportOptions;
use logcube_analytics::LogFile;
use logcube_analytics::Session;
use logcube_analytics::cube::Cube;
use logcube_analytics::cube::Dimension;
use logcube_analytics::cube::Filter;
use logcube_analytics::cube::Key;
use logcube_analytics::granularity::TruncationMode;
use logcube_analytics::pipeline::Pipeline;
use logcube_analytics::read::LoadProgress;
use logcube_analytics::spatial::SpatialIndex;
use logcube_analytics::spatial::reference;
use tracing::debug;
use tracing::info;

use crate::cli::FilterArgs;
use crate::cli::ImportArgs;
use crate::error::CliError;

/// A log read and annotated according to the import arguments.
pub(crate) struct Loaded {
    pub(crate) title: String,
    pub(crate) session: Session,
    pub(crate) spatial: Option<Arc<SpatialIndex>>,
}

pub(crate) fn load(args: &ImportArgs) -> Result<Loaded, CliError> {
    let spatial = match args.regions {
        Some(ref path) => Some(Arc::new(load_regions(path, &args.region_name_property)?)),
        None => None,
    };

    let truncation = if args.cascade_truncation {
        TruncationMode::Cascade
    } else {
        TruncationMode::Exact
    };
    let options = ImportOptions::new(args.granularity.into())
        .with_truncation(truncation)
        .with_chunk_size(args.chunk_size)
        .with_max_distance(args.max_distance);

    let mut reported: Option<u8> = None;
    let mut log = LogFile::open_with_progress(&args.path, move |progress: LoadProgress| {
        let decile = progress.percent().map(|percent| percent / 10);
        if decile != reported {
            reported = decile;
            debug!(loaded = progress.loaded, percent = ?progress.percent(), "reading log");
        }
    })?;

    if let Some(delimiter) = args.delimiter {
        log = log.with_delimiter(delimiter);
    }

    let batch = log.read_records()?;
    info!(
        path = %args.path.display(),
        records = batch.records.len(),
        malformed = batch.malformed,
        "read log"
    );

    let pipeline = Pipeline::from_batch(batch, options, spatial.clone());
    let session = pipeline.run(
        |progress| debug!(processed = progress.processed, total = progress.total, "annotated records"),
        Session::new,
    );

    Ok(Loaded {
        title: title(&args.path),
        session,
        spatial,
    })
}

fn load_regions(path: &Path, name_property: &str) -> Result<SpatialIndex, CliError> {
    let points = reference::from_path(path, name_property)?;
    info!(path = %path.display(), regions = points.len(), "loaded reference regions");

    Ok(SpatialIndex::new(points))
}

fn title(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Applies the filter arguments to `cube`. Several values for the same
/// column select the records matching any of them.
pub(crate) fn apply_filters(cube: &mut Cube, filter: &FilterArgs) -> Result<(), CliError> {
    if filter.from.is_some() || filter.to.is_some() {
        let from = filter.from.unwrap_or(DateTime::<Utc>::MIN_UTC);
        let to = filter.to.unwrap_or(DateTime::<Utc>::MAX_UTC);

        if from >= to {
            return Err(CliError::Filter(format!(
                "`--from` ({from}) must be earlier than `--to` ({to})"
            )));
        }

        cube.apply_filter(Dimension::Time, Filter::range(from, to));
    }

    let columns = [
        (Dimension::Platform, &filter.platform),
        (Dimension::ContentType, &filter.mime),
        (Dimension::ResourceType, &filter.rtype),
        (Dimension::Region, &filter.region),
    ];

    for (dimension, values) in columns {
        if let Some(filter) = value_filter(values) {
            cube.apply_filter(dimension, filter);
        }
    }

    Ok(())
}

fn value_filter(values: &[String]) -> Option<Filter> {
    match values {
        [] => None,
        [value] => Some(Filter::exact(value.as_str())),
        values => Some(Filter::Set(
            values.iter().map(|value| Key::from(value.as_str())).collect(),
        )),
    }
}
