/*
 * Copyright Grantmine Contributors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *      https://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! The `grantmine` command-line driver: parse a policy file, mine its
//! findings with an SMT-solver-backed oracle, optionally reduce them to
//! the minimum equivalent set, and write the findings document plus a
//! per-round timing CSV.

pub mod timing;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, ValueEnum};
use miette::{miette, IntoDiagnostic, Result, WrapErr};
use tracing::{debug, info};

use grantmine::json::{findings_to_value, parse_policy, policy_to_value};
use grantmine::miner::{mine, reduce};
use grantmine::symbolic::{LocalSolver, SmtOracle};

use timing::TimeMeasure;

/// Mine the least-privilege intents an IAM-style policy actually grants.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The policy document to mine.
    #[arg(short, long, value_name = "FILE")]
    pub file: PathBuf,

    /// Which SMT solver backs the symbolic oracle.
    #[arg(short, long, value_enum, default_value_t = SolverChoice::Cvc5)]
    pub solver: SolverChoice,

    /// Reduce the mined findings to a provably minimum equivalent set.
    #[arg(short, long)]
    pub reduce: bool,

    /// Directory for the findings and timing files. Defaults to the
    /// input file's directory.
    #[arg(short, long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Also append logs to this file.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

/// The supported solver backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SolverChoice {
    /// cvc5, found via `$CVC5` or `PATH`.
    Cvc5,
    /// Z3, found via `$Z3` or `PATH`.
    Z3,
}

/// Everything one run needs, resolved once. The core never reads ambient
/// state; this value is the only configuration that exists.
#[derive(Debug)]
pub struct RunConfig {
    /// The input policy file.
    pub input: PathBuf,
    /// Where the findings document goes.
    pub findings_path: PathBuf,
    /// Where the per-round timing CSV goes.
    pub timing_path: PathBuf,
    /// The solver backend.
    pub solver: SolverChoice,
    /// Whether to run the reduction stage.
    pub reduce: bool,
}

impl RunConfig {
    /// Resolves the CLI arguments into concrete paths, creating the
    /// output directory if needed.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        if !cli.file.is_file() {
            return Err(miette!(
                "input file `{}` does not exist or is not a file",
                cli.file.display()
            ));
        }
        let out_dir = match &cli.out_dir {
            Some(dir) => dir.clone(),
            None => cli.file.parent().unwrap_or(Path::new(".")).to_path_buf(),
        };
        fs::create_dir_all(&out_dir)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to create output directory `{}`", out_dir.display()))?;
        let stem = cli
            .file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("policy");
        Ok(Self {
            input: cli.file.clone(),
            findings_path: out_dir.join(format!("{stem}.findings.json")),
            timing_path: out_dir.join(format!("{stem}.rounds.csv")),
            solver: cli.solver,
            reduce: cli.reduce,
        })
    }
}

/// Installs the console (and optional file) logging layers.
pub fn init_logging(log_file: Option<&Path>) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(filter).with(console);

    match log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or(Path::new("."));
            let name = path.file_name().unwrap_or_else(|| "grantmine.log".as_ref());
            let appender = tracing_appender::rolling::never(dir, name);
            registry
                .with(fmt::layer().with_ansi(false).with_writer(appender))
                .try_init()
        }
        None => registry.try_init(),
    }
    .into_diagnostic()
    .wrap_err("failed to install the logging subscriber")
}

/// Parses, mines, optionally reduces, and writes the outputs.
pub fn run(cli: &Cli) -> Result<()> {
    let config = RunConfig::from_cli(cli)?;
    run_miner(&config)
}

/// The full mining run over a resolved configuration.
pub fn run_miner(config: &RunConfig) -> Result<()> {
    info!("input  path: {}", config.input.display());
    info!("output path: {}", config.findings_path.display());

    let text = fs::read_to_string(&config.input)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read `{}`", config.input.display()))?;
    let policy = parse_policy(&text)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to parse `{}`", config.input.display()))?;
    debug!(policy = %policy_to_value(&policy), "parsed policy");
    info!("[1/5] parsed policy");

    let solver = match config.solver {
        SolverChoice::Cvc5 => LocalSolver::cvc5(),
        SolverChoice::Z3 => LocalSolver::z3(),
    }
    .into_diagnostic()
    .wrap_err("failed to start the SMT solver process")?;
    let mut oracle = SmtOracle::new(solver);
    info!("[2/5] started {:?} solver", config.solver);

    let started = Instant::now();
    let report = mine(&policy, &mut oracle).into_diagnostic()?;
    info!("[3/5] mined findings: {}", report.findings.len());

    let findings = if config.reduce {
        let reduced = reduce(&policy, report.findings, &mut oracle).into_diagnostic()?;
        info!("[4/5] reduced findings: {}", reduced.len());
        reduced
    } else {
        info!("[4/5] reduction skipped");
        report.findings
    };

    let mut measure = TimeMeasure::new(report.rounds);
    measure.set_whole_time(started.elapsed());

    let rendered = serde_json::to_string_pretty(&findings_to_value(&findings))
        .into_diagnostic()
        .wrap_err("failed to render the findings document")?;
    fs::write(&config.findings_path, rendered)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to write `{}`", config.findings_path.display()))?;

    let mut csv = Vec::new();
    measure
        .write_csv(&mut csv)
        .into_diagnostic()
        .wrap_err("failed to render the timing file")?;
    fs::write(&config.timing_path, csv)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to write `{}`", config.timing_path.display()))?;

    info!(
        "[5/5] wrote {} findings and {} timing rounds",
        findings.len(),
        measure.rounds()
    );

    if let Err(err) = oracle.into_solver().clean_up() {
        debug!("solver cleanup failed: {err}");
    }
    Ok(())
}
