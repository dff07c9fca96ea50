use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use loan_sim::config::ServerConfig;
use loan_sim::core::{RiskBand, SimulationRequest, calculate_amortization_schedule, simulate};

#[derive(Parser, Debug)]
#[command(
    name = "loan-sim",
    version,
    about = "Loan simulator: monthly payment, amortization, APR and eligibility checks"
)]
struct Cli {
    #[arg(long, global = true, help = "TOML configuration file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        #[arg(long, help = "Port to listen on, overrides the configuration file")]
        port: Option<u16>,
    },
    /// Simulate a loan against a catalog product and print the result as JSON
    Simulate {
        #[arg(long)]
        product: u32,
        #[arg(long, help = "Loan amount")]
        amount: f64,
        #[arg(long, help = "Term in months")]
        term: u32,
        #[arg(long, help = "Gross annual income")]
        income: f64,
        #[arg(long, help = "Collateral value, enables the LTV check")]
        property_value: Option<f64>,
        #[arg(long, value_enum)]
        risk_band: Option<CliRiskBand>,
    },
    /// Print an amortization schedule as JSON
    Schedule {
        #[arg(long)]
        amount: f64,
        #[arg(long, help = "Annual interest rate in percent, e.g. 4.5")]
        rate: f64,
        #[arg(long, help = "Term in months")]
        term: u32,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliRiskBand {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl From<CliRiskBand> for RiskBand {
    fn from(value: CliRiskBand) -> Self {
        match value {
            CliRiskBand::Excellent => RiskBand::Excellent,
            CliRiskBand::Good => RiskBand::Good,
            CliRiskBand::Fair => RiskBand::Fair,
            CliRiskBand::Poor => RiskBand::Poor,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            ServerConfig::from_file(path)?
        }
        None => ServerConfig::default(),
    };
    let catalog = config.catalog()?;

    match cli.command {
        Command::Serve { port } => {
            let host: IpAddr = config.host.parse()?;
            let addr = SocketAddr::new(host, port.unwrap_or(config.port));
            loan_sim::api::run_http_server(addr, catalog).await?;
        }
        Command::Simulate {
            product,
            amount,
            term,
            income,
            property_value,
            risk_band,
        } => {
            let request = SimulationRequest {
                product_id: product,
                loan_type: None,
                loan_amount: amount,
                term_months: term,
                annual_income: income,
                property_value,
                risk_band: risk_band.map(Into::into),
            };
            let result = simulate(catalog.get(product)?, &request)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Schedule { amount, rate, term } => {
            let rows = calculate_amortization_schedule(amount, rate, term)?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }

    Ok(())
}
