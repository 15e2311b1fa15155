use std::fs::File;
use std::io::Write;
use std::path::Path;

use logcube_analytics::cube::TimeExtent;
use logcube_analytics::normalize::Warnings;
use serde::Serialize;
use tinytemplate::TinyTemplate;

use crate::chart::Chart;
use crate::error::Result;

const INDEX_TEMPLATE_NAME: &str = "index";
const PERIOD_FORMAT: &str = "%Y-%m-%d %H:%M";

pub struct TemplateEngine<'a> {
    index_file_path: &'a Path,
}

impl<'a> TemplateEngine<'a> {
    pub fn new(index_file_path: &'a Path) -> TemplateEngine<'a> {
        Self { index_file_path }
    }

    pub fn render(&self, context: &Context) -> Result<()> {
        let mut template = TinyTemplate::new();
        template.add_template(INDEX_TEMPLATE_NAME, include_str!("./template/index.html.tt"))?;

        let text = template.render(INDEX_TEMPLATE_NAME, context)?;

        let mut file = File::create(self.index_file_path)?;
        file.write_all(text.as_bytes())?;
        file.flush()?;

        Ok(())
    }
}

#[derive(Serialize, Debug)]
pub struct Context {
    title: String,
    events: usize,
    period: Period,
    has_warnings: bool,
    warnings: Vec<WarningLine>,
    data_files: Vec<String>,
    charts: Vec<Chart>,
}

impl Context {
    pub fn new(
        title: String,
        events: usize,
        extent: TimeExtent,
        warnings: &Warnings,
        data_files: Vec<String>,
        charts: Vec<Chart>,
    ) -> Context {
        let warnings = WarningLine::from_warnings(warnings);

        Self {
            title,
            events,
            period: Period {
                start: extent.start.format(PERIOD_FORMAT).to_string(),
                end: extent.end.format(PERIOD_FORMAT).to_string(),
                fallback: extent.fallback,
            },
            has_warnings: !warnings.is_empty(),
            warnings,
            data_files,
            charts,
        }
    }
}

#[derive(Serialize, Debug)]
struct Period {
    start: String,
    end: String,
    fallback: bool,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
struct WarningLine {
    label: &'static str,
    count: u64,
}

impl WarningLine {
    fn from_warnings(warnings: &Warnings) -> Vec<WarningLine> {
        [
            ("malformed rows skipped", warnings.malformed_rows),
            ("records without a usable time", warnings.missing_time),
            ("unparseable time values", warnings.invalid_time),
            ("unparseable coordinates", warnings.invalid_coordinates),
            ("records too far from every region", warnings.region_misses),
        ]
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(label, count)| WarningLine { label, count })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::Spec;
    use crate::id::Ids;
    use chrono::TimeZone;
    use chrono::Utc;
    use logcube_analytics::cube::Bucket;
    use logcube_analytics::cube::Key;
    use std::fs;

    fn extent() -> TimeExtent {
        TimeExtent {
            start: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap(),
            fallback: false,
        }
    }

    #[test]
    fn renders_charts_and_summary() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let index = dir.path().join("index.html");
        let buckets = vec![Bucket {
            key: Key::from("JSTOR"),
            value: 2,
        }];
        let chart = Chart::new(Ids::default().next(), "Platforms", &Spec::bar(&buckets))?;
        let warnings = Warnings {
            region_misses: 3,
            ..Warnings::default()
        };
        let context = Context::new(
            String::from("access.csv"),
            2,
            extent(),
            &warnings,
            vec![String::from("data1.js")],
            vec![chart],
        );

        TemplateEngine::new(&index).render(&context)?;

        let html = fs::read_to_string(&index)?;
        assert!(html.contains("<title>access.csv</title>"));
        assert!(html.contains("<script src=\"data/data1.js\"></script>"));
        assert!(html.contains("2 events from 2024-03-01 00:00 to 2024-03-09 00:00</p>"));
        assert!(html.contains("<li>3 records too far from every region</li>"));
        assert!(html.contains("<div id=\"chart1\" class=\"chart\"></div>"));
        assert!(html.contains("renderChart(\"chart1\", {\"traces\":[{\"type\":\"bar\""));

        Ok(())
    }

    #[test]
    fn lists_only_present_warnings() {
        let warnings = Warnings {
            malformed_rows: 1,
            invalid_time: 4,
            ..Warnings::default()
        };

        let lines = WarningLine::from_warnings(&warnings);

        assert_eq!(
            lines,
            vec![
                WarningLine {
                    label: "malformed rows skipped",
                    count: 1
                },
                WarningLine {
                    label: "unparseable time values",
                    count: 4
                },
            ]
        );
        assert!(WarningLine::from_warnings(&Warnings::default()).is_empty());
    }
}
