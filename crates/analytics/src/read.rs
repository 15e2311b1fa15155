use std::fmt;
use std::fs::File;
use std::io;
use std::io::BufReader;
use std::io::Read;
use std::path::Path;

use csv::DeserializeRecordsIntoIter;
use csv::ReaderBuilder;
use csv::Trim;
use tracing::debug;
use tracing::warn;

use crate::compression;
use crate::error::ReadError;
use crate::record::Record;

pub const DEFAULT_DELIMITER: u8 = b';';
pub const TAB_DELIMITER: u8 = b'\t';

const TAB_SEPARATED_EXTENSIONS: [&str; 2] = ["txt", "tsv"];
const COMPRESSED_EXTENSION: &str = "gz";

/// Chooses the column delimiter from the file name: tab for `.txt` and
/// `.tsv` files, `;` otherwise. A trailing `.gz` is ignored.
pub fn detect_delimiter(path: &Path) -> u8 {
    let path = match path.extension() {
        Some(ext) if ext.eq_ignore_ascii_case(COMPRESSED_EXTENSION) => path.with_extension(""),
        _ => path.to_path_buf(),
    };

    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext)
            if TAB_SEPARATED_EXTENSIONS
                .iter()
                .any(|tsv| ext.eq_ignore_ascii_case(tsv)) =>
        {
            TAB_DELIMITER
        }
        _ => DEFAULT_DELIMITER,
    }
}

/// How much of the input has been read so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: u64,
    pub total: Option<u64>,
}

impl LoadProgress {
    /// The loaded share in percent, when the total size is known.
    pub fn percent(&self) -> Option<u8> {
        match self.total {
            Some(0) => Some(100),
            Some(total) => Some((self.loaded.min(total) * 100 / total) as u8),
            None => None,
        }
    }
}

type LoadCallback = Box<dyn FnMut(LoadProgress)>;

/// A delimited consultation log with a header row.
///
/// The file is opened eagerly; rows are decoded lazily by the iterator
/// returned from [`LogFile::into_iter`].
pub struct LogFile {
    reader: Box<dyn Read>,
    delimiter: u8,
}

impl fmt::Debug for LogFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogFile")
            .field("delimiter", &(self.delimiter as char))
            .finish_non_exhaustive()
    }
}

impl LogFile {
    /// Opens a log file, detecting the delimiter from its name and gzip
    /// compression from its content.
    pub fn open(path: &Path) -> Result<LogFile, ReadError> {
        Self::open_with_progress(path, |_| {})
    }

    /// Same as [`LogFile::open`], reporting the number of bytes read from
    /// disk to `on_load` as decoding proceeds.
    pub fn open_with_progress<F>(path: &Path, on_load: F) -> Result<LogFile, ReadError>
    where
        F: FnMut(LoadProgress) + 'static,
    {
        let file = File::open(path)?;
        let total = file.metadata().ok().map(|m| m.len());
        let progress = ProgressReader::new(file, total, Box::new(on_load));
        let reader = compression::decompress(BufReader::new(progress))?;
        let delimiter = detect_delimiter(path);

        debug!(path = %path.display(), delimiter = %(delimiter as char), "opened log file");

        Ok(Self { reader, delimiter })
    }

    /// Reads a log from any source, using the default `;` delimiter.
    pub fn from_reader<R: Read + 'static>(reader: R) -> LogFile {
        Self {
            reader: Box::new(reader),
            delimiter: DEFAULT_DELIMITER,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> LogFile {
        self.delimiter = delimiter;
        self
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Reads every row, skipping the rows that cannot be decoded.
    ///
    /// I/O failures abort the read.
    pub fn read_records(self) -> Result<RecordBatch, ReadError> {
        let mut batch = RecordBatch::default();

        for (row, item) in self.into_iter().enumerate() {
            match item {
                Ok(record) => batch.records.push(record),
                Err(ReadError::Io(error)) => return Err(ReadError::Io(error)),
                Err(ReadError::Csv(error)) if error.is_io_error() => {
                    return Err(ReadError::Csv(error));
                }
                Err(error) => {
                    warn!(row = row + 1, %error, "skipping malformed row");
                    batch.malformed += 1;
                }
            }
        }

        Ok(batch)
    }
}

impl IntoIterator for LogFile {
    type Item = Result<Record, ReadError>;

    type IntoIter = RecordIterator;

    fn into_iter(self) -> Self::IntoIter {
        let reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(self.reader);

        RecordIterator {
            rows: reader.into_deserialize(),
        }
    }
}

/// An iterator that decodes [`Record`]s from the rows of a [`LogFile`].
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct RecordIterator {
    rows: DeserializeRecordsIntoIter<Box<dyn Read>, Record>,
}

impl Iterator for RecordIterator {
    type Item = Result<Record, ReadError>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next().map(|row| row.map_err(ReadError::from))
    }
}

/// The rows read from one log file.
#[derive(Debug, Default)]
pub struct RecordBatch {
    pub records: Vec<Record>,

    /// Number of rows skipped because they could not be decoded.
    pub malformed: u64,
}

struct ProgressReader<R> {
    inner: R,
    loaded: u64,
    total: Option<u64>,
    on_load: LoadCallback,
}

impl<R> ProgressReader<R> {
    fn new(inner: R, total: Option<u64>, on_load: LoadCallback) -> Self {
        Self {
            inner,
            loaded: 0,
            total,
            on_load,
        }
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.loaded += read as u64;

        (self.on_load)(LoadProgress {
            loaded: self.loaded,
            total: self.total,
        });

        Ok(read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::io::Write;
    use std::rc::Rc;

    const LOG: &str = "datetime;platform;mime;rtype;publication_title;extra
2024-03-15T10:00:00Z;JSTOR;PDF;ARTICLE;Nature;x
2024-03-15T11:00:00Z;Wiley;HTML;;Science;y
;Wiley;HTML;BOOK;;z
";

    #[test]
    fn detects_delimiter_from_extension() {
        assert_eq!(detect_delimiter(Path::new("log.csv")), b';');
        assert_eq!(detect_delimiter(Path::new("log.tsv")), b'\t');
        assert_eq!(detect_delimiter(Path::new("log.TXT")), b'\t');
        assert_eq!(detect_delimiter(Path::new("log.tsv.gz")), b'\t');
        assert_eq!(detect_delimiter(Path::new("log.csv.gz")), b';');
        assert_eq!(detect_delimiter(Path::new("log")), b';');
    }

    #[test]
    fn reads_recognized_columns() -> Result<(), ReadError> {
        let batch = LogFile::from_reader(Cursor::new(LOG)).read_records()?;

        assert_eq!(batch.malformed, 0);
        assert_eq!(batch.records.len(), 3);

        let first = &batch.records[0];
        assert_eq!(first.datetime.as_deref(), Some("2024-03-15T10:00:00Z"));
        assert_eq!(first.platform(), Some("JSTOR"));
        assert_eq!(first.mime(), Some("PDF"));
        assert_eq!(first.publication_title(), Some("Nature"));

        assert_eq!(batch.records[1].rtype(), None);
        assert_eq!(batch.records[2].datetime, None);

        Ok(())
    }

    #[test]
    fn reads_tab_separated_rows_with_missing_cells() -> Result<(), ReadError> {
        let log = "date\tmime\tgeoip-latitude\tgeoip-longitude\n2024-01-02\tPDF\t47.0\t8.0\n2024-01-03\n";

        let batch = LogFile::from_reader(Cursor::new(log))
            .with_delimiter(TAB_DELIMITER)
            .read_records()?;

        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records[0].latitude.as_deref(), Some("47.0"));
        assert_eq!(batch.records[1].date.as_deref(), Some("2024-01-03"));
        assert_eq!(batch.records[1].mime, None);

        Ok(())
    }

    #[test]
    fn reports_load_progress_from_disk() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile()?;
        file.write_all(LOG.as_bytes())?;

        let reports = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&reports);
        let log = LogFile::open_with_progress(file.path(), move |p| sink.borrow_mut().push(p))?;
        let batch = log.read_records()?;

        assert_eq!(batch.records.len(), 3);

        let reports = reports.borrow();
        let last = reports.last().copied().unwrap();
        assert_eq!(last.loaded, LOG.len() as u64);
        assert_eq!(last.percent(), Some(100));

        Ok(())
    }

    #[test]
    fn load_progress_percent() {
        let half = LoadProgress {
            loaded: 50,
            total: Some(200),
        };
        let unknown = LoadProgress {
            loaded: 50,
            total: None,
        };

        assert_eq!(half.percent(), Some(25));
        assert_eq!(unknown.percent(), None);
    }
}
