use facet::Facet;
use figue as args;
use gridlock_sim::Simulator;
use gridlock_types::{SimReport, TraceKind};

mod config;
mod demo;

const DEFAULT_DEMO_SEED: u64 = 0x6772_6964;

#[derive(Facet, Debug)]
struct Cli {
    #[facet(flatten)]
    builtins: args::FigueBuiltins,
    #[facet(args::subcommand)]
    command: Command,
}

#[derive(Facet, Debug)]
#[repr(u8)]
enum Command {
    Run {
        #[facet(args::named)]
        path: String,
        #[facet(args::named, default)]
        json: bool,
    },
    Demo {
        #[facet(args::named, default)]
        seed: Option<u64>,
        #[facet(args::named, default)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let figue_config = args::builder::<Cli>()
        .map_err(|e| format!("failed to build CLI schema: {e}"))?
        .cli(|cli| cli.strict())
        .help(|h| {
            h.program_name("gridlock")
                .description("Resource-allocation-graph deadlock simulator")
                .version(option_env!("CARGO_PKG_VERSION").unwrap_or("dev"))
        })
        .build();
    let cli = args::Driver::new(figue_config)
        .run()
        .into_result()
        .map_err(|e| e.to_string())?;

    match cli.value.command {
        Command::Run { path, json } => run_scenario_file(&path, json),
        Command::Demo { seed, json } => run_demo(seed.unwrap_or(DEFAULT_DEMO_SEED), json),
    }
}

fn run_scenario_file(path: &str, json: bool) -> Result<(), String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("read {path}: {e}"))?;
    let scenario = config::parse_scenario(&text).map_err(|e| format!("parse {path}: {e}"))?;
    let report = Simulator::run(&scenario);
    emit(&report, json)
}

fn run_demo(seed: u64, json: bool) -> Result<(), String> {
    let scenario = demo::contention_scenario(seed);
    if !json {
        println!(
            "demo scenario (seed {seed}): resources {}",
            scenario.resources.join(", ")
        );
    }
    let report = Simulator::run(&scenario);
    emit(&report, json)
}

fn emit(report: &SimReport, json: bool) -> Result<(), String> {
    if json {
        println!(
            "{}",
            facet_json::to_string_pretty(report).map_err(|e| format!("encode report: {e}"))?
        );
        return Ok(());
    }

    for entry in &report.trace {
        match &entry.kind {
            TraceKind::Granted { resource, process } => {
                println!("[t={}] {resource} -> {process} (granted)", entry.time);
            }
            TraceKind::Waiting {
                process,
                resource,
                holder,
            } => {
                println!(
                    "[t={}] {process} -> {resource} (waiting; held by {holder})",
                    entry.time
                );
            }
            TraceKind::Regranted { resource, process } => {
                println!("[t={}] {resource} -> {process} (regranted)", entry.time);
            }
            TraceKind::Terminated { process } => {
                println!("[t={}] {process} terminated", entry.time);
            }
        }
    }

    match &report.deadlock {
        Some(deadlock) => {
            println!(
                "\ndeadlock detected at t={}: {}",
                deadlock.time,
                deadlock.cycle.join(" -> ")
            );
        }
        None => println!("\nno deadlock detected"),
    }

    println!("\n--- metrics ---");
    println!("completed processes : {}", report.completed);
    println!("duration            : {} time units", report.duration_units);
    println!(
        "throughput          : {:.3} processes/time unit",
        report.throughput
    );
    println!(
        "average wait        : {:.2} time units",
        report.avg_wait_units
    );

    println!("\nper process:");
    for process in &report.processes {
        let arrival = process
            .arrival
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        let finish = process
            .finish
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {}: arrival={arrival}, finish={finish}, blocked={}",
            process.id, process.total_blocked
        );
    }

    Ok(())
}
