use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use clap::Parser;
use log::{info, warn, error};
use serde::Serialize;
use rowmatch::{
    CancelToken, CartesianEngine, Error, ExactEngine, MatchEngine, MatchResult,
    Result, RowLink, RowMatchConfig, RowMatcher, Score,
};
use rowmatch::config::subsystems::EngineKind;
use rowmatch::matcher::BarProgress;
use rowmatch::utils::init_logging;

const EXIT_ERROR: u8 = 1;
const EXIT_CANCELLED: u8 = 130;

/// Finds matching rows across CSV tables.
#[derive(Parser, Debug)]
#[command(name = "find_matches")]
#[command(about = "Match rows across two or more CSV tables")]
struct Args {
    /// Input tables (CSV with a header row)
    #[arg(required = true, num_args = 2..)]
    tables: Vec<PathBuf>,

    /// INI configuration file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Group rows transitively instead of best one-to-one pairs
    #[arg(long)]
    group: bool,

    /// Keep unmatched rows of this table (1-based), repeatable
    #[arg(long = "require-all", value_name = "TABLE")]
    require_all: Vec<usize>,

    /// Write JSON lines here instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Override [engine] max_distance
    #[arg(long)]
    max_distance: Option<f64>,

    /// Override [matcher] parallel
    #[arg(long)]
    parallel: bool,

    /// Hide the progress bar
    #[arg(long)]
    quiet: bool,
}

#[derive(Serialize)]
struct OutputLink<'a> {
    rows: &'a RowLink,
    #[serde(skip_serializing_if = "Option::is_none")]
    score: Option<Score>,
}

fn load_config(args: &Args) -> Result<RowMatchConfig> {
    let mut config = match &args.config {
        Some(path) => RowMatchConfig::from_ini(path)?,
        None => RowMatchConfig::default(),
    };
    if let Some(max_distance) = args.max_distance {
        config.engine.max_distance = max_distance;
    }
    if args.parallel {
        config.matcher.parallel = true;
    }
    config.validate()?;
    Ok(config)
}

/// Reads the selected columns of a CSV file as raw strings.
fn read_table(path: &Path, columns: &[String]) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let indices: Vec<usize> = if columns.is_empty() {
        (0..headers.len()).collect()
    } else {
        columns.iter()
            .map(|name| headers.iter().position(|h| h.trim() == name)
                .ok_or_else(|| Error::config(format!("Column {} not found in {:?}", name, path))))
            .collect::<Result<_>>()?
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(indices.iter()
            .map(|&i| record.get(i).unwrap_or("").trim().to_string())
            .collect());
    }
    info!("Loaded {} rows from {:?}", rows.len(), path);
    Ok(rows)
}

fn run_matcher<E: MatchEngine>(
    engine: &E,
    tables: &[Vec<E::Tuple>],
    args: &Args,
    config: &RowMatchConfig,
    cancel: &CancelToken,
    progress: Option<Arc<BarProgress>>,
) -> Result<MatchResult>
where
    E::Tuple: Clone,
{
    for param in engine.match_parameters() {
        info!("{} = {} ({})", param.name, param.value, param.description);
    }

    let mut matcher = RowMatcher::new(engine).with_config(config.matcher.clone());
    for table in tables {
        matcher.add_table(table);
    }
    matcher.set_cancel_token(cancel.clone());
    if let Some(bar) = &progress {
        matcher.set_progress_sink(bar.clone());
    }

    let mut require_all = vec![false; tables.len()];
    for &t in &args.require_all {
        match t.checked_sub(1).and_then(|i| require_all.get_mut(i)) {
            Some(flag) => *flag = true,
            None => return Err(Error::invalid_config(
                format!("--require-all {} is not a table number (1..={})", t, tables.len())
            )),
        }
    }

    let result = if args.group {
        matcher.find_group_matches(&require_all).map(MatchResult::from)
    } else {
        if tables.len() != 2 {
            return Err(Error::invalid_config("pair matching takes exactly 2 tables; use --group for more"));
        }
        matcher.find_pair_matches(require_all[0], require_all[1]).map(MatchResult::from)
    };

    if let Some(bar) = &progress {
        bar.finish();
    }
    result
}

fn write_links<W: Write>(out: W, result: &MatchResult) -> Result<()> {
    let mut out = BufWriter::new(out);
    for (rows, score) in result.scored_links() {
        serde_json::to_writer(&mut out, &OutputLink { rows, score })?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

fn run(args: &Args, cancel: &CancelToken) -> Result<()> {
    let config = load_config(args)?;
    if let Some(path) = init_logging(&config.logging)? {
        eprintln!("Logging to {:?}", path);
    }
    info!("Configuration: {:?}", config);

    let start_time = Instant::now();
    let raw: Vec<Vec<Vec<String>>> = args.tables.iter()
        .map(|path| read_table(path, &config.engine.columns))
        .collect::<Result<_>>()?;

    let progress = if args.quiet { None } else { Some(Arc::new(BarProgress::new())) };

    let result = match config.engine.kind {
        EngineKind::Cartesian => {
            let dimensions = raw.first().and_then(|t| t.first()).map(|r| r.len())
                .or_else(|| (!config.engine.columns.is_empty()).then(|| config.engine.columns.len()))
                .unwrap_or(1);
            let engine = CartesianEngine::with_bin_factor(
                dimensions, config.engine.max_distance, config.engine.bin_factor)?;
            // Unparseable cells become NaN and surface as row anomalies
            let tables: Vec<Vec<Vec<f64>>> = raw.iter()
                .map(|t| t.iter()
                    .map(|row| row.iter().map(|v| v.parse::<f64>().unwrap_or(f64::NAN)).collect())
                    .collect())
                .collect();
            run_matcher(&engine, &tables, args, &config, cancel, progress)?
        },
        EngineKind::Exact => {
            let engine = ExactEngine::<Vec<String>>::new();
            run_matcher(&engine, &raw, args, &config, cancel, progress)?
        },
    };

    match &args.output {
        Some(path) => write_links(File::create(path)?, &result)?,
        None => write_links(io::stdout().lock(), &result)?,
    }

    let summary = result.summary(args.tables.len());
    let anomalies = result.anomalies();
    for sample in &anomalies.sample {
        warn!("{}", sample);
    }
    let report = serde_json::json!({
        "matches": summary.match_count,
        "links": summary.link_count,
        "table_links": summary.table_subset_sizes(),
        "partial_tables": summary.partial_tables(),
        "anomalies": anomalies.count,
        "elapsed_secs": start_time.elapsed().as_secs_f64(),
    });
    info!("Summary: {}", report);
    eprintln!("{}", report);
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        eprintln!("Could not install Ctrl-C handler: {}", e);
    }

    match run(&args, &cancel) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_cancelled() => {
            info!("Cancelled by user");
            eprintln!("Cancelled");
            ExitCode::from(EXIT_CANCELLED)
        },
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        },
    }
}
