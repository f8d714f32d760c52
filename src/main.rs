use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use license_gate::{
    CheckoutOptions, CheckoutTtlPolicy, Config, Fixture, LicenseClient, LicenseError,
    MemoryBackend, ValidateOptions,
};

/// Validate, activate and check out license keys against a fixture backend
#[derive(Parser, Debug)]
#[command(name = "license-gate", version, about)]
struct Cli {
    /// JSON fixture with license records (defaults to LICENSE_GATE_FIXTURE)
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    /// Machine fingerprint presented to the backend
    #[arg(long, global = true)]
    fingerprint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a key, activating this machine when required
    Validate {
        key: String,

        /// Required entitlement (repeatable)
        #[arg(long = "entitlement")]
        entitlements: Vec<String>,

        /// Don't let the backend cache a valid response
        #[arg(long)]
        no_cache: bool,
    },

    /// Validate a key and check out an offline lease
    Checkout {
        key: String,

        #[arg(long = "entitlement")]
        entitlements: Vec<String>,

        /// Lease length in seconds
        #[arg(long)]
        ttl: Option<u64>,

        /// Lease that never expires
        #[arg(long)]
        forever: bool,

        /// Forward the TTL without bounding it
        #[arg(long)]
        passthrough: bool,
    },

    /// Show the current session, validating KEY first when given
    Status { key: Option<String> },

    /// Clear the current license, validating KEY first when given
    Reset {
        key: Option<String>,

        /// Also drop cached responses and leases
        #[arg(long)]
        hard: bool,

        /// Also clear the stored license key
        #[arg(long)]
        forget_key: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("license_gate=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(fingerprint) = &cli.fingerprint {
        config.fingerprint = fingerprint.clone();
    }

    let fixture = match cli.fixture.or_else(|| config.fixture_path.clone()) {
        Some(path) => Fixture::load(&path)
            .with_context(|| format!("failed to load fixture {}", path.display()))?,
        None => Fixture::default(),
    }
    .with_fingerprint(cli.fingerprint);

    let backend = Arc::new(MemoryBackend::from_fixture(fixture, &config));
    let client = LicenseClient::with_config(backend, &config);

    match run(&client, cli.command).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{}", serde_json::to_string_pretty(&err)?);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(
    client: &LicenseClient,
    command: Commands,
) -> Result<serde_json::Value, LicenseError> {
    match command {
        Commands::Validate {
            key,
            entitlements,
            no_cache,
        } => {
            let options = ValidateOptions::new(key)
                .entitlements(entitlements)
                .cache_valid_response(!no_cache);
            let license = client.validate_key(options).await?;
            Ok(json!({ "license": license }))
        }
        Commands::Checkout {
            key,
            entitlements,
            ttl,
            forever,
            passthrough,
        } => {
            let client = if passthrough {
                client.clone().with_ttl_policy(CheckoutTtlPolicy::PassThrough)
            } else {
                client.clone()
            };

            let mut options = CheckoutOptions::new(key)
                .entitlements(entitlements)
                .ttl_forever(forever);
            if let Some(ttl) = ttl {
                options = options.ttl_seconds(ttl);
            }

            let license = client.validate_checkout_key(options).await?;
            Ok(json!({ "license": license, "checked_out": license.valid }))
        }
        Commands::Status { key } => {
            if let Some(key) = key {
                client.validate_key(ValidateOptions::new(key)).await?;
            }
            session(client).await
        }
        Commands::Reset {
            key,
            hard,
            forget_key,
        } => {
            if let Some(key) = key {
                client.validate_key(ValidateOptions::new(key)).await?;
            }
            client.reset_license(hard).await?;
            if forget_key {
                client.reset_license_key().await?;
            }
            session(client).await
        }
    }
}

async fn session(client: &LicenseClient) -> Result<serde_json::Value, LicenseError> {
    Ok(json!({
        "license": client.license().await?,
        "key": client.license_key().await?,
        "has_valid_license": client.has_valid_license().await?,
        "can_update": client.can_update().await?,
    }))
}
