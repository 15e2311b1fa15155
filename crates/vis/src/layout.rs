mod data;
mod writer;

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use logcube_analytics::Session;
use logcube_analytics::cube::Bucket;
use logcube_analytics::cube::Dimension;
use logcube_analytics::spatial::ReferencePoint;
use logcube_analytics::spatial::SpatialIndex;
use tracing::info;

use crate::chart::Chart;
use crate::chart::RegionPoint;
use crate::chart::Series;
use crate::chart::Spec;
use crate::error::Result;
use crate::id::Ids;
use crate::layout::data::DataEngine;
use crate::template::Context;
use crate::template::TemplateEngine;

/// The number of titles listed in the report.
pub const TOP_TITLES: usize = 11;

/// The report directory is structured as follows:
///
/// ./vis/index.html
/// ./vis/report.js
/// ./vis/report.css
///
/// ./vis/data/data1.js
/// ./vis/data/data2.js
/// ./vis/data/...
/// ./vis/data/dataN.js
///
/// The __index__ file is the entry point of the report.
/// The __data__ directory holds one time series per content type.
pub struct VisLayout {
    root_path: PathBuf,
    index_file_path: PathBuf,
    data_path: PathBuf,
}

impl VisLayout {
    const MAIN_DIR_NAME: &str = "vis";
    const DATA_DIR_NAME: &str = "data";
    const INDEX_FILE_NAME: &str = "index.html";
    const SCRIPT_FILE_NAME: &str = "report.js";
    const STYLE_FILE_NAME: &str = "report.css";

    /// Creates the report directory under `path`, reusing it when it
    /// already exists.
    pub fn init(path: &Path) -> Result<VisLayout> {
        let root_path = path.join(Self::MAIN_DIR_NAME);
        let index_file_path = root_path.join(Self::INDEX_FILE_NAME);
        let data_path = root_path.join(Self::DATA_DIR_NAME);

        fs::create_dir_all(&root_path)?;
        fs::write(
            root_path.join(Self::SCRIPT_FILE_NAME),
            include_str!("./template/report.js"),
        )?;
        fs::write(
            root_path.join(Self::STYLE_FILE_NAME),
            include_str!("./template/report.css"),
        )?;

        Ok(Self {
            root_path,
            index_file_path,
            data_path,
        })
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn index_file_path(&self) -> &Path {
        &self.index_file_path
    }

    /// Writes the report of the records `session` currently selects.
    ///
    /// The region map is drawn when regions were derived and `spatial`
    /// holds their reference points.
    pub fn generate_report(
        &self,
        title: &str,
        session: &Session,
        spatial: Option<&SpatialIndex>,
    ) -> Result<()> {
        let files = DataEngine::new(&self.data_path).render(session)?;
        let (series, data_files): (Vec<Series>, Vec<String>) = files
            .into_iter()
            .map(|file| (file.series, file.file_name))
            .unzip();

        let cube = session.cube();
        let mut ids = Ids::default();
        let mut charts = vec![
            Chart::new(ids.next(), "Events over time", &Spec::stacked_time_series(&series))?,
            Chart::new(ids.next(), "Platforms", &Spec::bar(&cube.counts(Dimension::Platform)))?,
            Chart::new(ids.next(), "Content types", &Spec::pie(&cube.counts(Dimension::ContentType)))?,
            Chart::new(ids.next(), "Resource types", &Spec::pie(&cube.counts(Dimension::ResourceType)))?,
        ];

        let regions = cube.counts(Dimension::Region);
        if !regions.is_empty() {
            if let Some(spatial) = spatial {
                let points = locate_regions(spatial.points(), &regions);
                charts.push(Chart::new(ids.next(), "Region map", &Spec::region_map(&points))?);
            }
            charts.push(Chart::new(ids.next(), "Regions", &Spec::bar(&regions))?);
        }

        let titles = cube.top_n(Dimension::Title, TOP_TITLES);
        charts.push(Chart::new(
            ids.next(),
            "Top titles",
            &Spec::table(["Title", "Events"], &titles),
        )?);

        let chart_count = charts.len();
        let context = Context::new(
            title.to_string(),
            cube.selected_count(),
            cube.time_extent(),
            session.warnings(),
            data_files,
            charts,
        );

        TemplateEngine::new(&self.index_file_path).render(&context)?;

        info!(
            path = %self.index_file_path.display(),
            charts = chart_count,
            "generated report"
        );

        Ok(())
    }
}

/// Places every region with records at its reference point. Regions
/// sharing a name are drawn at the first point of that name.
fn locate_regions(points: &[ReferencePoint], regions: &[Bucket]) -> Vec<RegionPoint> {
    let mut by_name: HashMap<&str, &ReferencePoint> = HashMap::with_capacity(points.len());
    for point in points {
        by_name.entry(&*point.name).or_insert(point);
    }

    regions
        .iter()
        .filter(|bucket| bucket.value > 0)
        .filter_map(|bucket| {
            let name = bucket.key.as_text()?;
            let point = by_name.get(name)?;

            Some(RegionPoint {
                name: name.to_string(),
                longitude: point.x,
                latitude: point.y,
                count: bucket.value,
            })
        })
        .collect()
}
