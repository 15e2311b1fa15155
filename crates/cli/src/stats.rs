use std::io;
use std::io::Write;

use logcube_analytics::Session;
use logcube_analytics::cube::Bucket;
use logcube_analytics::cube::Dimension;
use logcube_analytics::cube::TimeExtent;
use logcube_analytics::granularity::Granularity;
use logcube_analytics::normalize::DistinctValues;
use logcube_analytics::normalize::Warnings;
use serde::Serialize;

use crate::cli::StatsArgs;
use crate::error::CliError;
use crate::import;

pub(crate) fn stats(args: StatsArgs) -> Result<(), CliError> {
    let mut loaded = import::load(&args.import)?;
    import::apply_filters(loaded.session.cube_mut(), &args.filter)?;

    let summary = Summary::new(&loaded.title, &loaded.session, args.top);

    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &summary)?;
    writeln!(stdout)?;

    Ok(())
}

#[derive(Serialize, Debug)]
struct Summary<'a> {
    source: &'a str,
    records: usize,
    events: usize,
    granularity: Granularity,
    period: TimeExtent,
    counts: Counts,
    top_titles: Vec<Bucket>,
    mimes: &'a DistinctValues,
    rtypes: &'a DistinctValues,
    warnings: &'a Warnings,
}

#[derive(Serialize, Debug)]
struct Counts {
    time: Vec<Bucket>,
    platform: Vec<Bucket>,
    content_type: Vec<Bucket>,
    resource_type: Vec<Bucket>,
    region: Vec<Bucket>,
}

impl<'a> Summary<'a> {
    fn new(source: &'a str, session: &'a Session, top: usize) -> Summary<'a> {
        let cube = session.cube();

        Self {
            source,
            records: cube.len(),
            events: cube.selected_count(),
            granularity: session.granularity(),
            period: cube.time_extent(),
            counts: Counts {
                time: cube.counts(Dimension::Time),
                platform: cube.counts(Dimension::Platform),
                content_type: cube.counts(Dimension::ContentType),
                resource_type: cube.counts(Dimension::ResourceType),
                region: cube.counts(Dimension::Region),
            },
            top_titles: cube.top_n(Dimension::Title, top),
            mimes: session.distinct_mimes(),
            rtypes: session.distinct_rtypes(),
            warnings: session.warnings(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logcube_analytics::ImportOptions;
    use logcube_analytics::cube::Filter;
    use logcube_analytics::pipeline::Pipeline;
    use logcube_analytics::record::Record;
    use serde_json::json;

    fn session() -> Session {
        let record = |datetime: &str, platform: &str, title: &str| Record {
            datetime: Some(String::from(datetime)),
            platform: Some(String::from(platform)),
            mime: Some(String::from("PDF")),
            publication_title: Some(String::from(title)),
            ..Record::default()
        };
        let records = vec![
            record("2024-03-01T10:00:00Z", "JSTOR", "Nature"),
            record("2024-03-01T11:00:00Z", "Wiley", "Science"),
            record("2024-03-02T10:00:00Z", "Wiley", "Nature"),
            Record::default(),
        ];

        Pipeline::new(records, ImportOptions::default(), None).run(|_| {}, Session::new)
    }

    #[test]
    fn summary_reports_counts_and_warnings() {
        let session = session();

        let summary = serde_json::to_value(Summary::new("access.csv", &session, 1)).unwrap();

        assert_eq!(summary["records"], json!(4));
        assert_eq!(summary["events"], json!(4));
        assert_eq!(summary["granularity"], json!("day"));
        assert_eq!(
            summary["counts"]["time"],
            json!([
                {"key": "2024-03-01T00:00:00Z", "value": 2},
                {"key": "2024-03-02T00:00:00Z", "value": 1}
            ])
        );
        assert_eq!(summary["top_titles"], json!([{"key": "Nature", "value": 2}]));
        assert_eq!(summary["mimes"], json!(["PDF"]));
        assert_eq!(summary["warnings"]["missing_time"], json!(1));
        assert_eq!(summary["period"]["fallback"], json!(false));
    }

    #[test]
    fn summary_follows_filters() {
        let mut session = session();
        session
            .cube_mut()
            .apply_filter(Dimension::Platform, Filter::exact("Wiley"));

        let summary = serde_json::to_value(Summary::new("access.csv", &session, 11)).unwrap();

        assert_eq!(summary["events"], json!(2));
        assert_eq!(
            summary["top_titles"],
            json!([{"key": "Nature", "value": 1}, {"key": "Science", "value": 1}])
        );
    }
}
