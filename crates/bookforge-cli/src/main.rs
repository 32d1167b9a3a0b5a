//! Bookforge command line entry point
//!
//! Generates one book project from a JSON request file.

use bookforge_core::{
    BookforgeConfig, FileQuotaLedger, GenerationOrchestrator, OpenAiImageClient, OpenAiTextClient,
};
use bookforge_types::{GenerationOutcome, GenerationProgress, GenerationRequest, Tier};
use clap::{Arg, ArgMatches, Command};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main]
async fn main() {
    // Initialize logging with INFO as default if RUST_LOG not set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = Command::new("bookforge")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Generate an illustrated book project from a request file")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config/bookforge.json"),
        )
        .arg(
            Arg::new("request")
                .long("request")
                .short('r')
                .value_name("FILE")
                .help("Generation request (JSON)")
                .required(true),
        )
        .arg(
            Arg::new("tier")
                .long("tier")
                .value_name("TIER")
                .help("Subscription tier: free, creator, professional, studio")
                .default_value("free"),
        )
        .arg(
            Arg::new("account")
                .long("account")
                .value_name("ID")
                .help("Account the generation is charged to")
                .default_value("local"),
        )
        .arg(
            Arg::new("ledger")
                .long("ledger")
                .value_name("FILE")
                .help("Quota ledger file (overrides quota.ledger_path)")
                .conflicts_with("monthly-count"),
        )
        .arg(
            Arg::new("monthly-count")
                .long("monthly-count")
                .value_name("N")
                .help("Generations already used this month, when no ledger is kept")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .value_name("FILE")
                .help("Write the project JSON here instead of stdout"),
        )
        .get_matches();

    if let Err(e) = run(&matches).await {
        log::error!("Generation failed: {}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run(matches: &ArgMatches) -> CliResult<()> {
    let config_path = required(matches, "config")?;
    let config = BookforgeConfig::from_file(config_path)?;
    log::info!("Loaded configuration from {}", config_path);

    let request_path = required(matches, "request")?;
    let request: GenerationRequest = serde_json::from_str(&std::fs::read_to_string(request_path)?)?;
    let tier: Tier = required(matches, "tier")?.parse()?;
    let account = required(matches, "account")?;

    let orchestrator = GenerationOrchestrator::new(
        OpenAiTextClient::new(config.text_service.clone()),
        OpenAiImageClient::new(config.image_service.clone()),
        config.pipeline.clone(),
    );

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, cancelling generation");
            ctrl_c_token.cancel();
        }
    });

    let (progress_tx, progress_rx) = tokio::sync::mpsc::unbounded_channel::<GenerationProgress>();
    let printer = tokio::spawn(async move {
        let mut events = UnboundedReceiverStream::new(progress_rx);
        while let Some(progress) = events.next().await {
            log::info!("[{:>3}%] {}", progress.percent, progress.phase_label);
        }
    });

    let ledger_path = matches
        .get_one::<String>("ledger")
        .cloned()
        .or_else(|| config.quota.ledger_path.clone());

    let result = match (ledger_path, matches.get_one::<u32>("monthly-count")) {
        (Some(path), None) => {
            let ledger = FileQuotaLedger::open(&path)?;
            orchestrator
                .generate_with_ledger(&ledger, account, tier, &request, &progress_tx, &cancel)
                .await
        }
        (_, count) => {
            let count = count.copied().unwrap_or(0);
            orchestrator
                .generate(&request, tier, count, &progress_tx, &cancel)
                .await
        }
    };

    drop(progress_tx);
    finish_printer(printer).await;

    let outcome = result?;
    write_outcome(&outcome, matches.get_one::<String>("output"))?;
    Ok(())
}

/// Wait for the progress printer to drain; returns false if it panicked or was aborted
async fn finish_printer(printer: JoinHandle<()>) -> bool {
    match printer.await {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Progress printer stopped abnormally: {}", e);
            false
        }
    }
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> CliResult<&'a String> {
    matches
        .get_one::<String>(name)
        .ok_or_else(|| format!("missing --{}", name).into())
}

fn write_outcome(outcome: &GenerationOutcome, output: Option<&String>) -> CliResult<()> {
    let project = &outcome.project;
    if outcome.is_complete() {
        log::info!(
            "Project '{}' ready: {} of {} pages illustrated",
            project.title,
            project.illustrated_page_count(),
            project.page_count()
        );
    } else {
        log::warn!(
            "Generation cancelled; keeping {} illustrated pages of '{}'",
            project.illustrated_page_count(),
            project.title
        );
    }

    let json = serde_json::to_string_pretty(project)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            log::info!("Wrote project to {}", path);
        }
        None => println!("{}", json),
    }
    Ok(())
}
