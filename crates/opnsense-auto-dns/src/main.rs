// # opnsense-auto-dns
//
// Keeps OPNsense Unbound host overrides pointed at this machine.
//
// This binary is a THIN integration layer:
// - Parses the command line
// - Merges configuration (file < flags < environment)
// - Wires the Unbound record store, an IP source and the updater together
// - Maps the outcome to an exit code
//
// All reconciliation logic lives in autodns-core.
//
// ## Configuration
//
// ### Environment (highest precedence)
// - `OPNSENSE_HOST`, `OPNSENSE_API_KEY`, `OPNSENSE_API_SECRET`
// - `DOMAIN`: Domain all host overrides live under
// - `HOSTNAMES`: Comma-separated hostnames (default: this machine's hostname)
// - `IP_ADDRESS`: Pinned target address (default: auto-detect)
// - `INTERVAL`: Minutes between passes in loop mode
// - `LOOP`, `IGNORE_CERT`: Booleans (`1`, `true`, `0`, `false`, ...)
//
// ### Flags
// Same settings as `--opnsense-host`, `--domain`, `--hostnames a,b`, ...
//
// ### Config file
// `--config /etc/opnsense-auto-dns.json`, JSON with the same keys in
// snake_case (`opnsense_host`, `hostnames`, ...)
//
// ## Example
//
// ```bash
// export OPNSENSE_API_KEY=...
// export OPNSENSE_API_SECRET=...
//
// opnsense-auto-dns auto-updater \
//     --opnsense-host fw.home.lan --domain home.lan \
//     --hostnames nas,media --loop --interval 10
// ```

use anyhow::{Context, Result};
use autodns_core::config::{ConfigOverrides, FileConfig, RunOptions, Settings};
use autodns_core::traits::{FixedIpSource, IpSource};
use autodns_core::{ReconciliationEngine, Updater};
use autodns_ip_probe::UdpProbeIpSource;
use autodns_provider_opnsense::UnboundRepository;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Clean exit (one-shot pass fully succeeded, or loop stopped)
/// - 1: Configuration or startup error
/// - 2: Runtime error (one-shot pass could not run or a hostname failed)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AutoDnsExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<AutoDnsExitCode> for ExitCode {
    fn from(code: AutoDnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Keep OPNsense Unbound host overrides pointed at this machine
#[derive(Parser, Debug)]
#[command(name = "opnsense-auto-dns", version, about)]
struct Cli {
    /// Log level (debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Update host overrides to the current IP, once or on an interval
    AutoUpdater(AutoUpdaterArgs),
}

#[derive(clap::Args, Debug, Clone)]
struct AutoUpdaterArgs {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Minutes between passes in loop mode
    #[arg(long, default_value_t = autodns_core::config::DEFAULT_INTERVAL_MINUTES)]
    interval: u64,

    /// Run passes forever instead of once
    #[arg(long = "loop")]
    run_loop: bool,

    /// Skip TLS certificate verification
    #[arg(long)]
    ignore_cert: bool,

    /// OPNsense management host (host or host:port)
    #[arg(long)]
    opnsense_host: Option<String>,

    /// OPNsense API key
    #[arg(long)]
    opnsense_api_key: Option<String>,

    /// OPNsense API secret
    #[arg(long)]
    opnsense_api_secret: Option<String>,

    /// Domain all host overrides live under
    #[arg(long)]
    domain: Option<String>,

    /// Pin the target address instead of detecting it
    #[arg(long)]
    ip_address: Option<String>,

    /// Hostnames to keep in sync (default: this machine's hostname)
    #[arg(long, value_delimiter = ',')]
    hostnames: Vec<String>,
}

impl AutoUpdaterArgs {
    fn run_options(&self) -> RunOptions {
        RunOptions {
            interval_minutes: self.interval,
            run_loop: self.run_loop,
            ignore_cert: self.ignore_cert,
        }
    }

    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            opnsense_host: self.opnsense_host.clone(),
            opnsense_api_key: self.opnsense_api_key.clone(),
            opnsense_api_secret: self.opnsense_api_secret.clone(),
            domain: self.domain.clone(),
            hostnames: Some(self.hostnames.clone()),
            ip_address: self.ip_address.clone(),
        }
        .normalized()
    }
}

/// Unknown levels fall back to info
fn parse_log_level(raw: &str) -> Level {
    match raw.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Merge file, flag and environment layers into validated settings
fn load_settings(args: &AutoUpdaterArgs) -> Result<Settings> {
    let mut config = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    config.apply(&args.overrides(), "flags");
    config.apply(&ConfigOverrides::from_env(), "environment");
    Ok(config.validate()?)
}

fn load_run_options(args: &AutoUpdaterArgs) -> Result<RunOptions> {
    let mut options = args.run_options();
    options.apply_env();
    options.validate()?;
    Ok(options)
}

fn build_updater(settings: &Settings, options: &RunOptions) -> Result<Updater> {
    let repository = UnboundRepository::from_settings(settings, options.ignore_cert)
        .context("Failed to create OPNsense client")?;
    let engine = ReconciliationEngine::new(Box::new(repository));

    let ip_source: Box<dyn IpSource> = match settings.ip_address {
        Some(ip) => Box::new(FixedIpSource::new(ip)),
        None => Box::new(UdpProbeIpSource::new()),
    };

    Ok(Updater::new(
        engine,
        ip_source,
        settings.domain.clone(),
        settings.hostnames.clone(),
    ))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_log_level(&cli.log_level))
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return AutoDnsExitCode::ConfigError.into();
    }

    match cli.command {
        Commands::AutoUpdater(args) => run_auto_updater(&args).into(),
    }
}

fn run_auto_updater(args: &AutoUpdaterArgs) -> AutoDnsExitCode {
    let options = match load_run_options(args) {
        Ok(options) => options,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return AutoDnsExitCode::ConfigError;
        }
    };

    let settings = match load_settings(args) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return AutoDnsExitCode::ConfigError;
        }
    };

    info!(
        host = %settings.opnsense_host,
        domain = %settings.domain,
        hostnames = ?settings.hostnames,
        pinned_ip = ?settings.ip_address,
        run_loop = options.run_loop,
        "Starting opnsense-auto-dns"
    );

    let updater = match build_updater(&settings, &options) {
        Ok(updater) => updater,
        Err(e) => {
            error!("Startup error: {:#}", e);
            return AutoDnsExitCode::ConfigError;
        }
    };

    // Passes are strictly sequential; nothing is spawned
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return AutoDnsExitCode::RuntimeError;
        }
    };

    rt.block_on(async {
        if options.run_loop {
            let interval = Duration::from_secs(options.interval_minutes * 60);
            match updater.run_loop(interval).await {
                Ok(()) => AutoDnsExitCode::CleanShutdown,
                Err(e) => {
                    error!("Updater error: {}", e);
                    AutoDnsExitCode::RuntimeError
                }
            }
        } else {
            match updater.run_pass().await {
                Ok(report) if !report.has_failures() => AutoDnsExitCode::CleanShutdown,
                Ok(report) => {
                    error!(failed = report.failed(), "Some DNS records could not be updated");
                    AutoDnsExitCode::RuntimeError
                }
                Err(e) => {
                    error!("Pass failed: {}", e);
                    AutoDnsExitCode::RuntimeError
                }
            }
        }
    })
}
