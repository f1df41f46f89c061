use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clientkit::{tls::build_transport, ClientsRegistrar, ConfigResolver, SourceLocation};
use clientkit_bootstrap::{AppConfig, CliArgs};
use mimalloc::MiMalloc;

use std::path::PathBuf;
use std::sync::Arc;

mod clients;

use clients::PaymentClient;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// ClientKit demo - discovers the HTTP client contracts linked into this binary
#[derive(Parser)]
#[command(name = "clientkit-demo")]
#[command(about = "ClientKit demo - registers declarative HTTP clients from configuration")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Module path to scan (repeatable; replaces clients.base_locations)
    #[arg(short, long = "location")]
    locations: Vec<String>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register all clients and list the registry
    Run,
    /// Validate configuration and exit
    Check,
    /// Fetch one payment through the registered `paymentClient`
    Call {
        /// Payment id
        id: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        print_config: cli.print_config,
        verbose: cli.verbose,
        locations: cli.locations.clone(),
    };

    // 1) defaults -> 2) YAML (if provided) -> 3) env (APP__*) -> 4) CLI overrides
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);
    if config.clients.base_locations.is_empty() {
        config.clients.base_locations = vec![concat!(module_path!(), "::clients").to_string()];
    }

    let logging_config = config.logging.clone().unwrap_or_default();
    clientkit_bootstrap::init_logging(&logging_config, &config.base_dir());

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&config),
        Commands::Check => check(&config),
        Commands::Call { id } => call(&config, id).await,
    }
}

fn registrar(config: &AppConfig) -> ClientsRegistrar {
    ClientsRegistrar::with_inventory(Arc::new(config.environment()))
        .with_options(config.clients.registrar_options())
        .with_transport(config.clients.transport.clone())
}

fn run(config: &AppConfig) -> Result<()> {
    let (registry, report) = registrar(config)
        .bootstrap()
        .context("client registration aborted")?;

    println!("Registered clients ({}):", registry.len());
    for name in registry.names() {
        let Some(configuration) = registry.configuration(name) else {
            continue;
        };
        println!(
            "  {name:<24} {url}  [log={level}, encoder={encoder}]",
            url = configuration.url,
            level = configuration.log_level,
            encoder = configuration.encoder_name(),
        );
    }

    if !report.is_complete() {
        println!("Failed contracts ({}):", report.failures.len());
        for failure in &report.failures {
            println!("  {}: {}", failure.type_name, failure.error);
        }
    }
    Ok(())
}

fn check(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    let resolver = ConfigResolver::new(Arc::new(config.environment()));
    let locations = resolver
        .base_locations()
        .context("clients.base-locations cannot be resolved")?;
    let parsed = SourceLocation::parse_list(&locations).context("invalid source location")?;
    build_transport(&config.clients.transport).context("transport cannot be built")?;

    println!(
        "Configuration OK: {} location(s), default log level {}",
        parsed.len(),
        resolver.environment_log_level()
    );
    Ok(())
}

async fn call(config: &AppConfig, id: u64) -> Result<()> {
    let (registry, report) = registrar(config).bootstrap()?;
    for failure in &report.failures {
        tracing::warn!(type_name = %failure.type_name, error = %failure.error, "contract skipped");
    }

    let payments = registry.get::<dyn PaymentClient>("paymentClient")?;
    let payment = payments
        .get_payment(id)
        .await
        .with_context(|| format!("fetching payment {id}"))?;

    println!("{}", serde_json::to_string_pretty(&payment)?);
    Ok(())
}
