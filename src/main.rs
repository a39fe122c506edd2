//! CLI entry point for the subway ridership analysis tool.
//!
//! Loads the monthly hourly ridership table once per invocation and runs one
//! analysis over it: congestion windows, traffic totals, pattern similarity,
//! hourly champions, two-station comparison, the cumulative race, or a
//! canonical re-export.

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use subway_flow::{
    analyzers::{
        aggregate::{AggregateQuery, GroupBy, congestion_ranking, station_totals, stations, traffic_ranking},
        compare::compare_stations,
        ranking::{champions_from, cumulative_top_n, line_breakdown},
        similarity::{Normalization, rank_similar},
        types::DirectionFilter,
    },
    cache::AnalysisCache,
    config::PipelineConfig,
    facts::FactTable,
    fetch::{BasicClient, fetch_bytes, is_remote},
    hours::{Hour, HourWindow},
    loader::Source,
    output::{append_record, export_to_path, print_json, print_pretty, write_rows},
    station::StationKey,
    stats::DatasetSummary,
};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "subway_flow")]
#[command(about = "Hourly subway ridership analysis", long_about = None)]
struct Cli {
    /// Path or URL of the ridership CSV (defaults to the configured candidates)
    #[arg(short, long, global = true, value_name = "FILE_OR_URL")]
    source: Option<String>,

    /// Write result rows to this CSV file instead of logging them as JSON
    #[arg(long, global = true)]
    csv: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the loaded dataset
    Summary {
        /// CSV file to append the summary to
        #[arg(short, long)]
        append: Option<String>,
    },
    /// List station keys
    Stations {
        #[arg(short, long, default_value_t = false)]
        combine: bool,
    },
    /// List line names
    Lines,
    /// Busiest stations per direction inside an hour window
    Congestion {
        /// First hour of the window (e.g. 08)
        #[arg(long)]
        from: Option<Hour>,

        /// Last hour of the window, inclusive (e.g. 18)
        #[arg(long)]
        to: Option<Hour>,

        #[arg(short = 'n', long)]
        top_n: Option<usize>,

        #[arg(short, long, default_value_t = false)]
        combine: bool,
    },
    /// Full-day boarding plus alighting totals
    Traffic {
        #[arg(short = 'n', long)]
        top_n: Option<usize>,

        /// Restrict to a single line
        #[arg(short, long)]
        line: Option<String>,

        #[arg(short, long, default_value_t = false)]
        combine: bool,
    },
    /// Stations whose hourly pattern resembles a reference station
    Similar {
        #[arg(long)]
        station: String,

        /// Line of the reference station (required unless --combine)
        #[arg(short, long)]
        line: Option<String>,

        /// 종합, 승차 or 하차
        #[arg(short, long, default_value = "종합")]
        analysis: DirectionFilter,

        /// share-of-total or row-minmax
        #[arg(long, default_value = "share-of-total")]
        normalization: Normalization,

        #[arg(short = 'n', long)]
        top_n: Option<usize>,

        #[arg(short, long, default_value_t = false)]
        combine: bool,
    },
    /// Busiest station for every hour and direction
    Champions {
        #[arg(short, long, default_value_t = false)]
        combine: bool,

        /// Split each combined champion's count by line
        #[arg(long, default_value_t = false)]
        by_line: bool,
    },
    /// Hour-by-hour boarding and alighting for two stations
    Compare {
        #[arg(long)]
        first: String,

        #[arg(long)]
        first_line: Option<String>,

        #[arg(long)]
        second: String,

        #[arg(long)]
        second_line: Option<String>,

        #[arg(short, long, default_value_t = false)]
        combine: bool,
    },
    /// Cumulative ranking as the service day progresses
    Race {
        #[arg(short = 'n', long)]
        top_n: Option<usize>,

        /// 종합, 승차 or 하차
        #[arg(short, long, default_value = "종합")]
        analysis: DirectionFilter,

        #[arg(short, long, default_value_t = false)]
        combine: bool,
    },
    /// Re-export the canonical wide table (UTF-8 with BOM)
    Export {
        #[arg(short, long, default_value = "canonical.csv")]
        output: String,

        /// Gzip compress the export
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/subway_flow.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("subway_flow.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::from_env()?;
    let mut cache = AnalysisCache::new();
    let table = load_table(&mut cache, cli.source.as_deref(), &config).await?;
    let csv = cli.csv.as_deref();

    match cli.command {
        Commands::Summary { append } => {
            let summary = DatasetSummary::from_table(&table);
            info!(
                rows_kept = summary.rows_kept,
                dropped_pct = summary.dropped_row_pct(),
                encoding = summary.encoding.name(),
                "Dataset loaded"
            );
            print_pretty(&summary);
            print_json(&summary)?;
            if let Some(path) = append {
                append_record(&path, &summary)?;
            }
        }
        Commands::Stations { combine } => {
            let keys = stations(&table, combine);
            info!(total = keys.len(), combine, "Station keys");
            print_json(&keys)?;
        }
        Commands::Lines => {
            print_json(&table.line_names())?;
        }
        Commands::Congestion {
            from,
            to,
            top_n,
            combine,
        } => {
            let default = config.window()?;
            let window = HourWindow::new(
                from.unwrap_or(default.start()),
                to.unwrap_or(default.end()),
            )?;
            let report =
                congestion_ranking(&table, window, combine, top_n.unwrap_or(config.default_top_n))?;
            print_json(&report)?;
            emit(csv, &station_totals(&table, Some(window), combine))?;
        }
        Commands::Traffic {
            top_n,
            line,
            combine,
        } => {
            if let Some(line) = &line {
                if !table.line_names().contains(line.as_str()) {
                    bail!("unknown line '{line}'");
                }
            }
            let rows = traffic_ranking(
                &table,
                combine,
                line.as_deref(),
                top_n.unwrap_or(config.default_top_n),
            )?;
            emit(csv, &rows)?;
        }
        Commands::Similar {
            station,
            line,
            analysis,
            normalization,
            top_n,
            combine,
        } => {
            let reference = station_key(&station, line.as_deref(), combine)?;
            let profiles = cache.profiles(combine, analysis, normalization)?;
            let rows = rank_similar(&profiles, &reference, top_n.unwrap_or(config.default_top_n))?;
            info!(reference = %reference, %analysis, matches = rows.len(), "Similar stations ranked");
            emit(csv, &rows)?;
        }
        Commands::Champions { combine, by_line } => {
            let query = AggregateQuery {
                combine,
                group_by: GroupBy {
                    hour: true,
                    direction: true,
                },
                ..Default::default()
            };
            let champions = champions_from(&cache.aggregate(&query)?);
            if by_line && combine {
                emit(csv, &line_breakdown(&table, &champions))?;
            } else {
                emit(csv, &champions)?;
            }
        }
        Commands::Compare {
            first,
            first_line,
            second,
            second_line,
            combine,
        } => {
            let first = station_key(&first, first_line.as_deref(), combine)?;
            let second = station_key(&second, second_line.as_deref(), combine)?;
            emit(csv, &compare_stations(&table, &first, &second)?)?;
        }
        Commands::Race {
            top_n,
            analysis,
            combine,
        } => {
            let series = cache.cumulative(combine, analysis)?;
            let rows = cumulative_top_n(&series, top_n.unwrap_or(config.default_top_n))?;
            emit(csv, &rows)?;
        }
        Commands::Export { output, gzip } => {
            export_to_path(&table, &output, gzip)?;
        }
    }

    Ok(())
}

/// Loads the table from a URL, a local path, or the configured candidates.
#[tracing::instrument(skip(cache, config))]
async fn load_table(
    cache: &mut AnalysisCache,
    source: Option<&str>,
    config: &PipelineConfig,
) -> Result<Arc<FactTable>> {
    let source = match source {
        Some(url) if is_remote(url) => {
            let client = BasicClient::new()?;
            Source::Bytes(fetch_bytes(&client, url).await?)
        }
        Some(path) => Source::Path(path.into()),
        None => Source::Candidates(config.source_candidates.clone()),
    };
    Ok(cache.load(&source)?)
}

fn station_key(station: &str, line: Option<&str>, combine: bool) -> Result<StationKey> {
    match (line, combine) {
        (_, true) => Ok(StationKey::for_mode("", station, true)),
        (Some(line), false) => Ok(StationKey::for_mode(line, station, false)),
        (None, false) => bail!("station '{station}' needs --line unless --combine is set"),
    }
}

fn emit<T: Serialize>(csv: Option<&str>, rows: &[T]) -> Result<()> {
    match csv {
        Some(path) => {
            write_rows(path, rows)?;
            info!(path, rows = rows.len(), "Results written");
        }
        None => print_json(&rows)?,
    }
    Ok(())
}
