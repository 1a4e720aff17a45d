//! FX CLI
//!
//! Command-line interface for the exchange-rate API.

use anyhow::Result;
use clap::{Parser, Subcommand};

use fx_client::FxClient;
use fx_types::{CreateProviderRequest, UpdateCurrencyRequest, UpdateProviderRequest};

#[derive(Parser)]
#[command(name = "fx")]
#[command(author, version, about = "Exchange-rate API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the exchange-rate API
    #[arg(long, env = "FX_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// API key for authentication
    #[arg(long, env = "FX_API_KEY")]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health
    Health,
    /// Rates for a source currency over a date range
    Rates {
        /// Source currency code
        source: String,
        /// Inclusive start date (YYYY-MM-DD)
        #[arg(long)]
        from: String,
        /// Inclusive end date (YYYY-MM-DD); defaults to --from
        #[arg(long)]
        to: Option<String>,
    },
    /// Convert an amount at today's rates
    Convert {
        /// Source currency code
        source: String,
        /// Amount to convert
        amount: Option<f64>,
        /// Target codes; every other known currency when omitted
        #[arg(long = "to", value_delimiter = ',')]
        targets: Vec<String>,
    },
    /// Bring every currency's cached rates up to today
    Refresh,
    /// Currency registry
    Currency {
        #[command(subcommand)]
        action: CurrencyCommands,
    },
    /// Rate provider credentials
    Provider {
        #[command(subcommand)]
        action: ProviderCommands,
    },
}

#[derive(Subcommand)]
enum CurrencyCommands {
    /// Register a currency
    Create {
        /// ISO code, e.g. CHF
        code: String,
        /// Display name
        name: String,
        #[arg(long, default_value = "")]
        symbol: String,
    },
    /// List all currencies
    List,
    /// Rename a currency or change its symbol
    Update {
        code: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        symbol: Option<String>,
    },
}

#[derive(Subcommand)]
enum ProviderCommands {
    /// Register a provider credential
    Create {
        /// Adapter name (CurrencyBeacon, Mock)
        name: String,
        #[arg(long)]
        priority: i32,
        #[arg(long, default_value = "")]
        token: String,
        #[arg(long, default_value = "")]
        url: String,
        /// Register without enabling it
        #[arg(long)]
        disabled: bool,
    },
    /// List credentials in failover order
    List,
    /// Change a credential; omitted options are left as they are
    Update {
        /// Credential id as shown by `provider list`
        id: String,
        #[arg(long)]
        priority: Option<i32>,
        #[arg(long)]
        token: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        #[arg(long)]
        disable: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut client = FxClient::new(&cli.api_url);
    if let Some(key) = cli.api_key {
        client = client.with_api_key(key);
    }

    match cli.command {
        Commands::Health => {
            let healthy = client.health().await?;
            if healthy {
                println!("✓ API is healthy");
            } else {
                println!("✗ API is not healthy");
                std::process::exit(1);
            }
        }

        Commands::Rates { source, from, to } => {
            let to = to.unwrap_or_else(|| from.clone());
            let table = client.rates(&source, &from, &to).await?;
            println!("{}", serde_json::to_string_pretty(&table)?);
        }

        Commands::Convert {
            source,
            amount,
            targets,
        } => {
            let targets: Vec<&str> = targets.iter().map(String::as_str).collect();
            let result = client.convert(&source, &targets, amount).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Refresh => {
            let report = client.refresh().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Currency { action } => match action {
            CurrencyCommands::Create { code, name, symbol } => {
                let currency = client.create_currency(&code, &name, &symbol).await?;
                println!("{}", serde_json::to_string_pretty(&currency)?);
            }
            CurrencyCommands::List => {
                let currencies = client.list_currencies().await?;
                println!("{}", serde_json::to_string_pretty(&currencies)?);
            }
            CurrencyCommands::Update { code, name, symbol } => {
                let req = UpdateCurrencyRequest { name, symbol };
                let currency = client.update_currency(&code, &req).await?;
                println!("{}", serde_json::to_string_pretty(&currency)?);
            }
        },

        Commands::Provider { action } => match action {
            ProviderCommands::Create {
                name,
                priority,
                token,
                url,
                disabled,
            } => {
                let req = CreateProviderRequest {
                    name,
                    token,
                    url,
                    priority,
                    enabled: !disabled,
                };
                let provider = client.create_provider(&req).await?;
                println!("{}", serde_json::to_string_pretty(&provider)?);
            }
            ProviderCommands::List => {
                let providers = client.list_providers().await?;
                println!("{}", serde_json::to_string_pretty(&providers)?);
            }
            ProviderCommands::Update {
                id,
                priority,
                token,
                url,
                enable,
                disable,
            } => {
                let req = UpdateProviderRequest {
                    token,
                    url,
                    priority,
                    enabled: toggle(enable, disable),
                };
                let provider = client.update_provider(&id, &req).await?;
                println!("{}", serde_json::to_string_pretty(&provider)?);
            }
        },
    }

    Ok(())
}

/// `--enable`/`--disable` pair to an optional flag.
fn toggle(enable: bool, disable: bool) -> Option<bool> {
    match (enable, disable) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}
