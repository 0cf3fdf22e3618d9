//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::comparison::{compare_prices, ComparisonRun, RankingMetric};
use crate::domain::config_validation::{optional_date, optional_double, validate_config};
use crate::domain::engine_config::EngineConfig;
use crate::domain::error::EngineError;
use crate::domain::goal::GoalSpec;
use crate::domain::returns::DEFAULT_MIN_HISTORY;
use crate::domain::universe::{load_universe, parse_codes};
use crate::domain::weights::Constraints;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceDataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "stratfolio",
    about = "Compare portfolio allocation strategies on historical prices"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every strategy and write the comparison report
    Compare {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Override [engine] seed
        #[arg(long)]
        seed: Option<u64>,
        /// Comma-separated codes overriding [data] codes
        #[arg(long)]
        codes: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for code(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
    },
}

/// Installs the stderr log subscriber. `RUST_LOG` overrides the default
/// `stratfolio=info` filter.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("stratfolio=info"));
    // A second install (e.g. from tests) is a no-op.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Compare {
            config,
            output,
            seed,
            codes,
        } => run_compare(&config, output.as_deref(), seed, codes.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, code } => run_info(&config, code.as_deref()),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| report_error(&e))
}

fn report_error(e: &EngineError) -> ExitCode {
    eprintln!("error: {e}");
    e.into()
}

pub fn build_engine_config(
    config: &dyn ConfigPort,
    seed_override: Option<u64>,
) -> Result<EngineConfig, EngineError> {
    let defaults = EngineConfig::default();

    let ranking = match config.get_string("engine", "ranking") {
        Some(s) if !s.trim().is_empty() => {
            s.parse::<RankingMetric>()
                .map_err(|e| EngineError::ConfigInvalid {
                    section: "engine".into(),
                    key: "ranking".into(),
                    reason: e.to_string(),
                })?
        }
        _ => defaults.ranking,
    };

    let seed = match seed_override {
        Some(s) => s,
        None => {
            let raw = config.get_int("engine", "seed", defaults.seed as i64);
            u64::try_from(raw).map_err(|_| EngineError::ConfigInvalid {
                section: "engine".into(),
                key: "seed".into(),
                reason: "seed must be non-negative".into(),
            })?
        }
    };

    let count = |section: &str, key: &str, default: usize| -> Result<usize, EngineError> {
        let raw = config.get_int(section, key, default as i64);
        usize::try_from(raw)
            .ok()
            .filter(|v| *v >= 1)
            .ok_or_else(|| EngineError::ConfigInvalid {
                section: section.into(),
                key: key.into(),
                reason: format!("{} must be at least 1", key),
            })
    };

    Ok(EngineConfig {
        risk_free_rate: config.get_double("engine", "risk_free_rate", defaults.risk_free_rate),
        seed,
        sharpe_iterations: count("engine", "sharpe_iterations", defaults.sharpe_iterations)?,
        momentum_lookback: count("engine", "momentum_lookback", defaults.momentum_lookback)?,
        volatility_floor: config.get_double(
            "engine",
            "volatility_floor",
            defaults.volatility_floor,
        ),
        min_variance_max_iterations: count(
            "engine",
            "min_variance_max_iterations",
            defaults.min_variance_max_iterations,
        )?,
        kelly_max_fraction: config.get_double(
            "engine",
            "kelly_max_fraction",
            defaults.kelly_max_fraction,
        ),
        ranking,
        min_history: count("data", "min_history", DEFAULT_MIN_HISTORY)?,
    })
}

pub fn build_constraints(config: &dyn ConfigPort) -> Result<Constraints, EngineError> {
    Ok(Constraints {
        max_weight: optional_double(config, "engine", "max_weight")?,
        fully_invested: config.get_bool("engine", "fully_invested", true),
    })
}

pub fn build_goal(config: &dyn ConfigPort) -> Result<GoalSpec, EngineError> {
    let defaults = GoalSpec::default();
    let horizon = config.get_int("goal", "horizon_years", defaults.horizon_years as i64);
    let goal = GoalSpec {
        initial_capital: config.get_double("goal", "initial_capital", defaults.initial_capital),
        target_capital: config.get_double("goal", "target_capital", defaults.target_capital),
        horizon_years: u32::try_from(horizon).map_err(|_| EngineError::ConfigInvalid {
            section: "goal".into(),
            key: "horizon_years".into(),
            reason: "horizon_years must be a positive whole number".into(),
        })?,
    };
    goal.validate()?;
    Ok(goal)
}

/// Codes from `--codes` when given, otherwise `[data] codes`.
pub fn resolve_codes(
    codes_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, EngineError> {
    let raw = match codes_override {
        Some(c) => c.to_string(),
        None => config
            .get_string("data", "codes")
            .ok_or_else(|| EngineError::ConfigMissing {
                section: "data".into(),
                key: "codes".into(),
            })?,
    };
    parse_codes(&raw).map_err(|e| EngineError::ConfigInvalid {
        section: "data".into(),
        key: "codes".into(),
        reason: e.to_string(),
    })
}

fn price_dir(config: &dyn ConfigPort) -> Result<PathBuf, EngineError> {
    config
        .get_string("data", "price_dir")
        .filter(|s| !s.trim().is_empty())
        .map(|s| PathBuf::from(s.trim()))
        .ok_or_else(|| EngineError::ConfigMissing {
            section: "data".into(),
            key: "price_dir".into(),
        })
}

fn run_compare(
    config_path: &Path,
    output_path: Option<&Path>,
    seed: Option<u64>,
    codes_override: Option<&str>,
) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_config(&adapter) {
        return report_error(&e);
    }

    // Stage 2: Price source and output path
    let data_port = match price_dir(&adapter) {
        Ok(dir) => CsvAdapter::new(dir),
        Err(e) => return report_error(&e),
    };
    let output = output_path
        .map(Path::to_path_buf)
        .or_else(|| adapter.get_string("report", "output").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("comparison.csv"));

    // Stages 3-6: Load, compare, summarize and write
    match run_compare_pipeline(
        &adapter,
        &data_port,
        &CsvReportAdapter::new(),
        &output,
        seed,
        codes_override,
    ) {
        Ok(_) => {
            eprintln!("\nReport written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}

/// Loads prices for the configured codes, compares every strategy, prints
/// the summary to stderr and writes the report.
pub fn run_compare_pipeline(
    config: &dyn ConfigPort,
    data_port: &dyn PriceDataPort,
    report_port: &dyn ReportPort,
    output: &Path,
    seed: Option<u64>,
    codes_override: Option<&str>,
) -> Result<ComparisonRun, EngineError> {
    let engine = build_engine_config(config, seed)?;
    let constraints = build_constraints(config)?;
    let goal = build_goal(config)?;
    let codes = resolve_codes(codes_override, config)?;
    let start = optional_date(config, "data", "start_date")?;
    let end = optional_date(config, "data", "end_date")?;

    eprintln!("Loading prices for {} codes...", codes.len());
    let universe = load_universe(data_port, &codes, start, end)?;

    eprintln!(
        "Comparing strategies over {} instruments (seed {})",
        universe.count(),
        engine.seed
    );
    let mut run = compare_prices(&universe.prices, &constraints, &goal, &engine)?;
    let mut skipped = universe.skipped;
    skipped.append(&mut run.skipped);
    run.skipped = skipped;

    print_summary(&run, &goal);

    report_port.write(&run.comparison, &goal, &output.to_string_lossy())?;
    Ok(run)
}

fn print_summary(run: &ComparisonRun, goal: &GoalSpec) {
    let comparison = &run.comparison;

    eprintln!(
        "\n=== Universe: {} ({} aligned returns) ===",
        run.codes.join(", "),
        run.observations
    );
    for s in &run.skipped {
        eprintln!("  skipped {}: {}", s.code, s.reason);
    }

    eprintln!(
        "\n=== Comparison (ranked by {}, goal {:.0} -> {:.0} in {} years) ===",
        comparison.ranking, goal.initial_capital, goal.target_capital, goal.horizon_years
    );
    eprintln!(
        "{:<4}{:<20}{:>10}{:>10}{:>9}{:>9}{:>10}{:>12}",
        "#", "Strategy", "Return", "Vol", "Sharpe", "Sortino", "MaxDD", "Years"
    );
    for (i, row) in comparison.rows.iter().enumerate() {
        let m = &row.metrics;
        let years = row
            .projection
            .years_to_target
            .map(|y| format!("{:.1}", y))
            .unwrap_or_else(|| "never".to_string());
        eprintln!(
            "{:<4}{:<20}{:>9.2}%{:>9.2}%{:>9.2}{:>9.2}{:>9.1}%{:>12}",
            i + 1,
            row.strategy.to_string(),
            m.annualized_return * 100.0,
            m.annualized_volatility * 100.0,
            m.sharpe_ratio,
            m.sortino_ratio,
            m.max_drawdown * 100.0,
            years
        );
        if let Some(f) = &row.fallback {
            eprintln!("    fell back to {}: {}", f.to, f.reason);
        }
    }
    for o in &comparison.omitted {
        eprintln!("  omitted {}: {}", o.strategy, o.reason);
    }

    if let Some(best) = comparison.best_risk_adjusted() {
        eprintln!("\nBest risk-adjusted: {}", best.strategy);
        for (code, w) in best.weights.iter() {
            eprintln!("  {:<12}{:>7.2}%", code, w * 100.0);
        }
        if best.weights.cash() > 0.0 {
            eprintln!("  {:<12}{:>7.2}%", "cash", best.weights.cash() * 100.0);
        }
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_config(&adapter) {
        return report_error(&e);
    }

    let summary = build_engine_config(&adapter, None).and_then(|engine| {
        let constraints = build_constraints(&adapter)?;
        let goal = build_goal(&adapter)?;
        let codes = resolve_codes(None, &adapter)?;
        Ok((engine, constraints, goal, codes))
    });
    let (engine, constraints, goal, codes) = match summary {
        Ok(s) => s,
        Err(e) => return report_error(&e),
    };

    eprintln!("\nUniverse:");
    eprintln!("  codes: {}", codes.join(", "));
    eprintln!("  min_history: {}", engine.min_history);
    eprintln!("\nEngine:");
    eprintln!("  risk_free_rate: {}", engine.risk_free_rate);
    match constraints.max_weight {
        Some(cap) => eprintln!("  max_weight: {}", cap),
        None => eprintln!("  max_weight: none"),
    }
    eprintln!("  fully_invested: {}", constraints.fully_invested);
    eprintln!("  seed: {}", engine.seed);
    eprintln!("  ranking: {}", engine.ranking);
    eprintln!("\nGoal:");
    eprintln!(
        "  {:.0} -> {:.0} in {} years (requires {:.2}% a year)",
        goal.initial_capital,
        goal.target_capital,
        goal.horizon_years,
        goal.required_cagr() * 100.0
    );

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_info(config_path: &Path, code: Option<&str>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let data_port = match price_dir(&config) {
        Ok(dir) => CsvAdapter::new(dir),
        Err(e) => return report_error(&e),
    };

    let codes = match code {
        Some(c) => vec![c.trim().to_uppercase()],
        None => match resolve_codes(None, &config) {
            Ok(codes) => codes,
            Err(_) => match data_port.list_symbols() {
                Ok(symbols) => symbols,
                Err(e) => return report_error(&e),
            },
        },
    };

    print_data_ranges(&data_port, &codes);
    ExitCode::SUCCESS
}

pub fn print_data_ranges(data_port: &dyn PriceDataPort, codes: &[String]) {
    for c in codes {
        match data_port.get_data_range(c) {
            Ok(Some((min_date, max_date, count))) => {
                println!("{}: {} closes, {} to {}", c, count, min_date, max_date);
            }
            Ok(None) => eprintln!("{}: no data found", c),
            Err(e) => eprintln!("error querying {}: {}", c, e),
        }
    }
}
