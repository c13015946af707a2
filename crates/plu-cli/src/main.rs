use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use plu_core::{
    determine_conversation_branch, geometry_to_display_polygons, AssistantConfig,
    ConversationBranch,
};
use plu_enrichment::EnrichmentStage;
use plu_session::{run_simulation, ScriptedFetcher, SimulationReport};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const SIMULATION_HORIZON: Duration = Duration::from_secs(30);

fn cli() -> Command {
    Command::new("plu-assistant")
        .version(plu_session::VERSION)
        .about("PLU assistant enrichment tools")
        .subcommand_required(true)
        .subcommand(
            Command::new("simulate")
                .about("Run a scripted conversation and check its loading sequence")
                .arg(
                    Arg::new("branch")
                        .long("branch")
                        .required(true)
                        .value_parser(["rnu", "analysis", "source"])
                        .help("Branch the scripted address classifies into"),
                )
                .arg(
                    Arg::new("fail-stage")
                        .long("fail-stage")
                        .value_parser(value_parser!(EnrichmentStage))
                        .help("Stage whose first attempt fails"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML file overriding timings and cache settings"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output the report as JSON"),
                ),
        )
        .subcommand(
            Command::new("classify")
                .about("Classify a conversation from its enrichment flags")
                .arg(
                    Arg::new("is-rnu")
                        .long("is-rnu")
                        .required(true)
                        .value_parser(value_parser!(bool)),
                )
                .arg(
                    Arg::new("has-analysis")
                        .long("has-analysis")
                        .required(true)
                        .value_parser(value_parser!(bool)),
                ),
        )
        .subcommand(
            Command::new("geometry")
                .about("Convert a GeoJSON zone outline into [lat, lon] display rings")
                .arg(
                    Arg::new("path")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("GeoJSON Polygon or MultiPolygon file"),
                ),
        )
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("simulate", args)) => {
            let report = simulate(args).await?;
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            if !report.matches_expected() {
                std::process::exit(1);
            }
        }
        Some(("classify", args)) => {
            let is_rnu = args.get_one::<bool>("is-rnu").copied().unwrap_or_default();
            let has_analysis = args.get_one::<bool>("has-analysis").copied().unwrap_or_default();
            let branch = determine_conversation_branch(is_rnu, has_analysis);
            println!("{branch}\t{}", branch.badge());
        }
        Some(("geometry", args)) => {
            let Some(path) = args.get_one::<PathBuf>("path") else {
                bail!("missing geometry path");
            };
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let geometry: serde_json::Value =
                serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
            let rings: Vec<Vec<[f64; 2]>> = geometry_to_display_polygons(Some(&geometry))
                .into_iter()
                .map(|ring| ring.into_iter().map(|point| point.to_array()).collect())
                .collect();
            println!("{}", serde_json::to_string(&rings)?);
        }
        _ => unreachable!("subcommand is required"),
    }
    Ok(())
}

async fn simulate(args: &ArgMatches) -> anyhow::Result<SimulationReport> {
    let branch = match args.get_one::<String>("branch").map(String::as_str) {
        Some("rnu") => ConversationBranch::Rnu,
        Some("analysis") => ConversationBranch::NonRnuAnalysis,
        Some("source") => ConversationBranch::NonRnuSource,
        other => bail!("unsupported branch {other:?}"),
    };
    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => AssistantConfig::load(path)?,
        None => AssistantConfig::default(),
    };

    let mut fetcher = ScriptedFetcher::for_branch(branch);
    if let Some(stage) = args.get_one::<EnrichmentStage>("fail-stage") {
        fetcher = fetcher.with_failure(*stage, format!("{stage} unavailable"));
    }

    tracing::info!(%branch, "starting simulation");
    let report = run_simulation(config, branch, Arc::new(fetcher), SIMULATION_HORIZON).await?;
    Ok(report)
}

fn print_report(report: &SimulationReport) {
    println!("Branch: {} ({})", report.branch, report.branch.badge());
    for transition in &report.transitions {
        match transition.view.caption() {
            Some(caption) => println!("  {:>6} ms  {caption}", transition.at_ms),
            None => println!("  {:>6} ms  ready", transition.at_ms),
        }
    }
    println!("Retries: {}", report.retries);
    println!("Persistence failures: {}", report.persistence_failures);
    println!(
        "Sequence: {}",
        if report.matches_expected() { "OK" } else { "MISMATCH" }
    );
}
