use std::env;
use std::path::PathBuf;

use chrono::DateTime;
use chrono::Utc;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use logcube_analytics::granularity::Granularity;
use logcube_analytics::options::DEFAULT_CHUNK_SIZE;
use logcube_analytics::options::DEFAULT_MAX_DISTANCE;
use logcube_analytics::spatial::reference::DEFAULT_NAME_PROPERTY;

use crate::error::CliError;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Generate an HTML report of a consultation log.
    View(ViewArgs),

    /// Print a JSON summary of a consultation log.
    Stats(StatsArgs),
}

#[derive(Args)]
pub(crate) struct ViewArgs {
    #[command(flatten)]
    pub(crate) import: ImportArgs,

    #[command(flatten)]
    pub(crate) filter: FilterArgs,

    /// Specify the path where the report will be created.
    /// If the output path is not specified then the current working
    /// directory is used.
    #[arg(short, long, value_parser(parse_dir_path))]
    pub(crate) output_path: Option<PathBuf>,
}

#[derive(Args)]
pub(crate) struct StatsArgs {
    #[command(flatten)]
    pub(crate) import: ImportArgs,

    #[command(flatten)]
    pub(crate) filter: FilterArgs,

    /// Specify how many publication titles to list.
    #[arg(short, long, default_value_t = 11)]
    pub(crate) top: usize,
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// Specify the consultation log to read.
    ///
    /// Files ending in `.tsv` or `.txt` are tab separated, any other file
    /// is `;` separated. Gzip compressed files are decompressed.
    #[arg(short, long, value_parser(parse_file_path))]
    pub(crate) path: PathBuf,

    /// Specify the resolution of the time buckets.
    #[arg(short, long, value_enum, default_value_t = GranularityArg::Day)]
    pub(crate) granularity: GranularityArg,

    /// Truncate every timestamp through all the finer resolutions too,
    /// so that month buckets start on a Sunday.
    #[arg(long)]
    pub(crate) cascade_truncation: bool,

    /// Override the column delimiter detected from the file name.
    /// Use `tab` or `\t` for tabs.
    #[arg(short, long, value_parser(parse_delimiter))]
    pub(crate) delimiter: Option<u8>,

    /// Specify a GeoJSON file of reference regions used to locate the
    /// records by their geoip coordinates.
    #[arg(short, long, value_parser(parse_file_path))]
    pub(crate) regions: Option<PathBuf>,

    /// Specify the feature property that names a reference region.
    #[arg(long, default_value = DEFAULT_NAME_PROPERTY)]
    pub(crate) region_name_property: String,

    /// Specify the largest squared distance between a record and a
    /// reference region for the record to be attributed to it.
    #[arg(long, default_value_t = DEFAULT_MAX_DISTANCE)]
    pub(crate) max_distance: f64,

    /// Specify how many records are annotated between two progress reports.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub(crate) chunk_size: usize,
}

#[derive(Args, Debug, Default)]
pub(crate) struct FilterArgs {
    /// Keep the time buckets that start at or after this timestamp.
    #[arg(long)]
    pub(crate) from: Option<DateTime<Utc>>,

    /// Keep the time buckets that start before this timestamp.
    #[arg(long)]
    pub(crate) to: Option<DateTime<Utc>>,

    /// Keep the records of this platform. May be repeated.
    #[arg(long)]
    pub(crate) platform: Vec<String>,

    /// Keep the records of this content type. May be repeated.
    #[arg(long)]
    pub(crate) mime: Vec<String>,

    /// Keep the records of this resource type. May be repeated.
    #[arg(long)]
    pub(crate) rtype: Vec<String>,

    /// Keep the records located in this region. May be repeated.
    #[arg(long)]
    pub(crate) region: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum GranularityArg {
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl From<GranularityArg> for Granularity {
    fn from(value: GranularityArg) -> Self {
        match value {
            GranularityArg::Minute => Granularity::Minute,
            GranularityArg::Hour => Granularity::Hour,
            GranularityArg::Day => Granularity::Day,
            GranularityArg::Week => Granularity::Week,
            GranularityArg::Month => Granularity::Month,
        }
    }
}

fn parse_file_path(path: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(path);

    if !path.exists() {
        return Err(format!("The `{}` path does not exist.", path.display()));
    }

    if !path.is_file() {
        return Err(format!("The `{}` path must point to a file.", path.display()));
    }

    Ok(path)
}

fn parse_dir_path(path: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(path);

    if !path.exists() {
        return Err(format!("The `{}` path does not exist.", path.display()));
    }

    if !path.is_dir() {
        return Err(format!(
            "The `{}` path must point to a directory.",
            path.display()
        ));
    }

    Ok(path)
}

fn parse_delimiter(delimiter: &str) -> Result<u8, String> {
    match delimiter {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        _ => match delimiter.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(format!(
                "The `{delimiter}` delimiter must be a single ASCII character."
            )),
        },
    }
}

pub(crate) trait PathExt {
    fn or_current_dir(self) -> Result<PathBuf, CliError>;
}

impl PathExt for Option<PathBuf> {
    fn or_current_dir(self) -> Result<PathBuf, CliError> {
        if let Some(path) = self {
            Ok(path)
        } else {
            env::current_dir().map_err(|e| CliError::Path(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_stats_arguments() -> Result<(), Box<dyn std::error::Error>> {
        let log = tempfile::Builder::new().suffix(".tsv").tempfile()?;
        let path = log.path().to_string_lossy().to_string();

        let cli = Cli::try_parse_from([
            "logcube",
            "stats",
            "--path",
            &path,
            "--granularity",
            "week",
            "--delimiter",
            "tab",
            "--platform",
            "JSTOR",
            "--platform",
            "Wiley",
            "--from",
            "2024-03-01T00:00:00Z",
            "--top",
            "5",
        ])?;

        let Commands::Stats(args) = cli.command else {
            panic!("expected the stats command");
        };
        assert_eq!(args.import.granularity, GranularityArg::Week);
        assert_eq!(args.import.delimiter, Some(b'\t'));
        assert_eq!(args.import.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(args.import.region_name_property, "name");
        assert_eq!(args.filter.platform, vec!["JSTOR", "Wiley"]);
        assert!(args.filter.from.is_some());
        assert_eq!(args.top, 5);

        Ok(())
    }

    #[test]
    fn rejects_missing_log_file() {
        let result = Cli::try_parse_from(["logcube", "stats", "--path", "/no/such/access.csv"]);

        assert!(result.is_err());
    }

    #[test]
    fn delimiter_must_be_one_character() {
        assert_eq!(parse_delimiter(","), Ok(b','));
        assert_eq!(parse_delimiter("\\t"), Ok(b'\t'));
        assert!(parse_delimiter(";;").is_err());
        assert!(parse_delimiter("é").is_err());
    }

    #[test]
    fn granularity_argument_maps_to_granularity() {
        assert_eq!(Granularity::from(GranularityArg::Month), Granularity::Month);
        assert_eq!(Granularity::from(GranularityArg::Minute), Granularity::Minute);
    }
}
