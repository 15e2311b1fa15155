use std::fmt::Display;
use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::path::Path;

use chrono::DateTime;
use chrono::Utc;
use logcube_analytics::Session;
use logcube_analytics::cube::Condition;
use logcube_analytics::cube::Dimension;
use logcube_analytics::record::Field;

use crate::chart::Series;
use crate::layout::writer::SeriesWriter;

const DATA_FILE_NAME: &str = "data";
const ALL_EVENTS: &str = "events";

/// Writes the time series of a session to the data directory of a report.
pub struct DataEngine<'a> {
    path: &'a Path,
}

/// A series and the name of the data file that defines its arrays.
#[derive(Debug, Clone)]
pub struct SeriesFile {
    pub series: Series,
    pub file_name: String,
}

impl<'a> DataEngine<'a> {
    pub fn new(path: &'a Path) -> DataEngine<'a> {
        Self { path }
    }

    /// Writes one series per distinct content type, in the order the
    /// content types were first seen, counting the records of each time
    /// bucket. A session without content types gets a single series of all
    /// timed records.
    pub fn render(&self, session: &Session) -> Result<Vec<SeriesFile>, std::io::Error> {
        if !self.path.exists() {
            fs::create_dir(self.path)?;
        }

        let cube = session.cube();
        let mut conditions: Vec<(String, Option<Condition>)> = session
            .distinct_mimes()
            .iter()
            .map(|mime| (mime.to_string(), Some(Condition::new(Field::Mime, mime))))
            .collect();

        if conditions.is_empty() {
            conditions.push((String::from(ALL_EVENTS), None));
        }

        let mut files = Vec::with_capacity(conditions.len());

        for (number, (name, condition)) in (1u32..).zip(conditions) {
            let file_name = format!("{DATA_FILE_NAME}{number}.js");
            let series = Series::new(name, number);
            let file: File = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(self.path.join(&file_name))?;

            let mut writer = SeriesWriter::new(file, &series);
            writer.start()?;

            for bucket in cube.group_by(Dimension::Time, condition.as_ref()) {
                if let Some(time) = bucket.key.as_time() {
                    writer.write(Timestamp(time), bucket.value)?;
                }
            }

            writer.end()?;
            files.push(SeriesFile { series, file_name });
        }

        Ok(files)
    }
}

struct Timestamp(DateTime<Utc>);

impl Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\"", self.0.to_rfc3339())
    }
}
