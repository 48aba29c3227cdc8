use anyhow::{anyhow, Context, Result};
use clap::{arg, ArgMatches, Command};
use mdp_algorithms::iterated_tabu::{Params, SolveOutcome, Solver};
use mdp_challenges::diversity::{Challenge, SizeBounds, Solution, Track};
use serde::Serialize;
use serde_json::{Map, Value};
use std::{
    fmt::Write as _,
    fs,
    io::{self, Read, Write},
    path::PathBuf,
    time::Duration,
};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("mdp-runtime")
        .about("Solves, generates or verifies maximum diversity instances")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("solve")
                .about("Runs seeded trials of the iterated tabu search")
                .arg(
                    arg!(<INSTANCE> "Path to an instance file")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--lower <LOWER> "Minimum subset size")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--upper <UPPER> "Maximum subset size")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--trials [TRIALS] "Number of independent runs")
                        .default_value("10")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"seed-step" [SEED_STEP] "Trial t runs with seed t * SEED_STEP")
                        .default_value("1000")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--"iterations-coef" [COEF] "Evaluations per start are max(10000, n * COEF)")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--"time-limit" [SECONDS] "Wall clock budget of each trial")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    arg!(--"max-restarts" [STARTS] "Stop each trial after this many starts")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--hyperparameters [HYPERPARAMETERS] "Hyperparameters json string or path to json file")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--report [REPORT_FILE] "If set, the text report is also written to this file")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--output [OUTPUT_FILE] "If set, all outcomes are saved to this file as json")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("generate_instance")
                .about("Generates a random instance")
                .arg(arg!(<SIZE> "Number of items").value_parser(clap::value_parser!(usize)))
                .arg(
                    arg!(--seed [SEED] "Generator seed")
                        .default_value("0")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--"min-weight" [MIN_WEIGHT] "Smallest pair weight")
                        .default_value("0")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    arg!(--"max-weight" [MAX_WEIGHT] "Largest pair weight")
                        .default_value("1000")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    arg!(--output [OUTPUT_FILE] "If set, the instance is written here instead of stdout")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("verify_solution")
                .about("Verifies a solution and prints its value")
                .arg(
                    arg!(<INSTANCE> "Path to an instance file")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(<SOLUTION> "Solution json string, path to json file, or '-' for stdin")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--lower <LOWER> "Minimum subset size")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--upper <UPPER> "Maximum subset size")
                        .value_parser(clap::value_parser!(usize)),
                ),
        )
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let matches = cli().get_matches();

    if let Err(e) = match matches.subcommand() {
        Some(("solve", sub_m)) => run_solve(sub_m),
        Some(("generate_instance", sub_m)) => run_generate_instance(sub_m),
        Some(("verify_solution", sub_m)) => run_verify_solution(sub_m),
        _ => Err(anyhow!("Invalid subcommand")),
    } {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn required<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, id: &str) -> Result<T> {
    matches
        .get_one::<T>(id)
        .cloned()
        .ok_or_else(|| anyhow!("Missing argument {}", id))
}

fn run_solve(m: &ArgMatches) -> Result<()> {
    let mut params = Params::initialize(&load_hyperparameters(m.get_one::<String>("hyperparameters"))?);
    if let Some(coef) = m.get_one::<u64>("iterations-coef") {
        params.iterations_coef = *coef;
    }
    if let Some(secs) = m.get_one::<f64>("time-limit") {
        params.time_limit_secs = *secs;
    }
    if let Some(max) = m.get_one::<usize>("max-restarts") {
        params.max_restarts = Some(*max);
    }
    solve(
        required(m, "INSTANCE")?,
        SizeBounds::new(required(m, "lower")?, required(m, "upper")?),
        required(m, "trials")?,
        required(m, "seed-step")?,
        params,
        m.get_one::<PathBuf>("report").cloned(),
        m.get_one::<PathBuf>("output").cloned(),
    )
}

fn run_generate_instance(m: &ArgMatches) -> Result<()> {
    generate_instance(
        required(m, "SIZE")?,
        required(m, "seed")?,
        required(m, "min-weight")?,
        required(m, "max-weight")?,
        m.get_one::<PathBuf>("output").cloned(),
    )
}

fn run_verify_solution(m: &ArgMatches) -> Result<()> {
    verify_solution(
        required(m, "INSTANCE")?,
        required::<String>(m, "SOLUTION")?,
        SizeBounds::new(required(m, "lower")?, required(m, "upper")?),
    )
}

#[derive(Serialize)]
struct TrialRecord {
    trial: usize,
    seed: u64,
    #[serde(flatten)]
    outcome: SolveOutcome,
}

pub fn solve(
    instance_path: PathBuf,
    bounds: SizeBounds,
    trials: usize,
    seed_step: u64,
    params: Params,
    report_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
) -> Result<()> {
    let challenge = Challenge::from_file(&instance_path)?;
    if trials == 0 {
        return Err(anyhow!("At least one trial is required"));
    }
    tracing::info!(
        "Loaded {} with {} items, running {} trials",
        instance_path.display(),
        challenge.num_items,
        trials
    );

    let mut report = String::new();
    let mut records = Vec::with_capacity(trials);
    for trial in 1..=trials {
        let seed = (trial as u64).saturating_mul(seed_step);
        let trial_params = Params { seed, ..params };
        let outcome = Solver::solve(&challenge, bounds, &trial_params, None)
            .with_context(|| format!("Trial {} (seed {}) failed", trial, seed))?;
        let schedule = trial_params.schedule(challenge.num_items, &bounds);
        write_trial_report(&mut report, &challenge, &bounds, &trial_params, schedule.it_bound, &outcome)?;
        records.push(TrialRecord {
            trial,
            seed,
            outcome,
        });
    }
    write_summary(&mut report, &records)?;

    print!("{}", report);
    if let Some(path) = report_file {
        fs::write(&path, &report)
            .with_context(|| format!("Failed to write report file: {}", path.display()))?;
    }
    if let Some(path) = output_file {
        let json = serde_json::to_string_pretty(&records)?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write output file: {}", path.display()))?;
    }
    Ok(())
}

fn write_trial_report(
    out: &mut String,
    challenge: &Challenge,
    bounds: &SizeBounds,
    params: &Params,
    it_bound: u64,
    outcome: &SolveOutcome,
) -> std::fmt::Result {
    let stats = &outcome.statistics;
    writeln!(out, "   graph order                    = {:5}", challenge.num_items)?;
    writeln!(out, "   lower bound                    = {:5}", bounds.lower)?;
    writeln!(out, "   upper bound                    = {:5}", bounds.upper)?;
    writeln!(out, "   time limit                     = {:5}", params.time_limit_secs)?;
    writeln!(out, "   number of iterations per start = {:10}", it_bound)?;
    writeln!(out, "   number of starts executed      = {:3}", stats.restarts)?;
    writeln!(out, "   number of improvements         = {:3}", stats.improvements)?;
    writeln!(out, "   last improvement at start no.  = {:2}", stats.last_improvement_restart)?;
    writeln!(out, "   solution value                 = {:11.3}", outcome.value)?;
    writeln!(out, "   subgraph size                  = {:5}", outcome.solution.items.len())?;
    writeln!(out, "   time to solution: {}", format_duration(stats.time_to_best))?;
    writeln!(out, "   total time: {}", format_duration(outcome.total_time))?;
    writeln!(out)
}

fn write_summary(out: &mut String, records: &[TrialRecord]) -> std::fmt::Result {
    let mut total_value = 0.0;
    let mut total_time = 0.0;
    for record in records {
        let time = record.outcome.statistics.time_to_best.as_secs_f64();
        writeln!(out, "    {:11.3}       {:8.3}", record.outcome.value, time)?;
        total_value += record.outcome.value;
        total_time += time;
    }
    let count = records.len().max(1) as f64;
    writeln!(out, "     {:11.3}    {:11.3}", total_value / count, total_time / count)
}

/// `h : m : s.ms  (=S seconds)`
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!(
        "{} : {} : {}.{:03}  (={:4} seconds)",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        duration.subsec_millis(),
        secs
    )
}

pub fn generate_instance(
    size: usize,
    seed: u64,
    min_weight: f64,
    max_weight: f64,
    output_file: Option<PathBuf>,
) -> Result<()> {
    let mut seed_bytes = [0u8; 32];
    seed_bytes[..8].copy_from_slice(&seed.to_le_bytes());
    let track = Track {
        num_items: size,
        min_weight,
        max_weight,
    };
    let challenge = Challenge::generate_instance(&seed_bytes, &track)?;
    match output_file {
        Some(path) => {
            let file = fs::File::create(&path)
                .with_context(|| format!("Failed to create instance file: {}", path.display()))?;
            challenge.write_to(io::BufWriter::new(file))?;
            tracing::info!("Wrote {} items to {}", size, path.display());
        }
        None => challenge.write_to(io::stdout().lock())?,
    }
    Ok(())
}

pub fn verify_solution(instance_path: PathBuf, solution: String, bounds: SizeBounds) -> Result<()> {
    let challenge = Challenge::from_file(&instance_path)?;
    let solution = load_solution(&solution)?;
    let value = challenge.verify_solution(&solution, &bounds)?;
    println!("Solution is valid, value {:.3}", value);
    io::stdout().flush()?;
    Ok(())
}

fn load_hyperparameters(hyperparameters: Option<&String>) -> Result<Option<Map<String, Value>>> {
    let Some(hyperparameters) = hyperparameters else {
        return Ok(None);
    };
    let text = if hyperparameters.ends_with(".json") {
        fs::read_to_string(hyperparameters)
            .with_context(|| format!("Failed to read hyperparameters file: {}", hyperparameters))?
    } else {
        hyperparameters.clone()
    };
    match serde_json::from_str::<Value>(&text).context("Failed to parse hyperparameters")? {
        Value::Object(map) => Ok(Some(map)),
        _ => Err(anyhow!("Hyperparameters must be a json object")),
    }
}

fn load_solution(solution: &str) -> Result<Solution> {
    let solution = if solution == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read solution from stdin")?;
        buffer
    } else if solution.ends_with(".json") {
        fs::read_to_string(solution)
            .with_context(|| format!("Failed to read solution file: {}", solution))?
    } else {
        solution.to_string()
    };
    serde_json::from_str::<Solution>(&solution).context("Failed to parse solution")
}
