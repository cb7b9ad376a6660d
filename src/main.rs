use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use esewa_client::adapters::EsewaClient;
use esewa_client::config::{AppConfig, Environment, InitiationMode};
use esewa_client::domain::{
    canonical_message, CallbackVerification, PaymentInitiation, PaymentRequest,
    PAYMENT_SIGNED_FIELDS,
};
use esewa_client::ports::{CallOptions, PaymentGateway};
use serde_json::json;
use tracing_subscriber::EnvFilter;

/// eSewa ePay v2 command line client.
///
/// Merchant settings come from `ESEWA__GATEWAY__*` environment variables
/// (or a `.env` file). Results are printed to stdout as JSON.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Override the configured gateway environment
    #[arg(long, global = true)]
    environment: Option<Environment>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute a payment signature
    Sign {
        #[arg(long)]
        total_amount: String,

        #[arg(long)]
        transaction_uuid: String,

        /// Defaults to the configured product code
        #[arg(long)]
        product_code: Option<String>,
    },

    /// Sign a payment and print the form, or post it and print the redirect
    Initiate {
        #[arg(long)]
        amount: String,

        #[arg(long)]
        total_amount: String,

        #[arg(long)]
        transaction_uuid: String,

        #[arg(long)]
        tax_amount: Option<String>,

        #[arg(long)]
        service_charge: Option<String>,

        #[arg(long)]
        delivery_charge: Option<String>,

        /// Post the form server-side and report the redirect URL
        #[arg(long)]
        follow_redirect: bool,

        /// Print an auto-submitting HTML form instead of JSON
        #[arg(long, conflicts_with = "follow_redirect")]
        html: bool,
    },

    /// Decode a base64 callback payload without verifying it
    Decode {
        /// Value of the `data` query parameter
        data: String,
    },

    /// Decode a base64 callback payload and verify its signature
    Verify {
        /// Value of the `data` query parameter
        data: String,
    },

    /// Query the status of a transaction
    Status {
        #[arg(long)]
        transaction_uuid: String,

        #[arg(long)]
        total_amount: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let options = CallOptions {
        timeout: cli.timeout.map(Duration::from_secs),
    };

    match cli.command {
        // Decoding needs no merchant settings.
        Command::Decode { data } => {
            init_tracing("info");
            let callback = CallbackVerification::from_base64(&data)?;
            print_json(&callback)?;
        }
        Command::Sign {
            total_amount,
            transaction_uuid,
            product_code,
        } => {
            let client = build_client(cli.environment, InitiationMode::ReturnPayload)?;
            let code = product_code.unwrap_or_else(|| client.config().product_code.clone());
            let values = [total_amount.as_str(), transaction_uuid.as_str(), code.as_str()];
            let message = canonical_message(PAYMENT_SIGNED_FIELDS.into_iter().zip(values));
            let signature = client.generate_signature(&total_amount, &transaction_uuid, &code);
            print_json(&json!({ "message": message, "signature": signature }))?;
        }
        Command::Initiate {
            amount,
            total_amount,
            transaction_uuid,
            tax_amount,
            service_charge,
            delivery_charge,
            follow_redirect,
            html,
        } => {
            let mode = if follow_redirect {
                InitiationMode::FollowRedirect
            } else {
                InitiationMode::ReturnPayload
            };
            let client = build_client(cli.environment, mode)?;

            let mut request = PaymentRequest::new(amount, total_amount, transaction_uuid);
            if let Some(tax) = tax_amount {
                request = request.with_tax_amount(tax);
            }
            if let Some(charge) = service_charge {
                request = request.with_service_charge(charge);
            }
            if let Some(charge) = delivery_charge {
                request = request.with_delivery_charge(charge);
            }

            let initiation = client.initiate_payment(request, options).await?;
            match (&initiation, html) {
                (PaymentInitiation::Payload(payload), true) => print!("{}", payload.to_html_form()),
                _ => print_json(&initiation)?,
            }
        }
        Command::Verify { data } => {
            let client = build_client(cli.environment, InitiationMode::ReturnPayload)?;
            let callback = client.verify_encoded_callback(&data)?;
            print_json(&callback)?;
        }
        Command::Status {
            transaction_uuid,
            total_amount,
        } => {
            let client = build_client(cli.environment, InitiationMode::ReturnPayload)?;
            let result = client
                .transaction_status(&transaction_uuid, &total_amount, options)
                .await?;
            print_json(&json!({
                "result": result,
                "state": result.state(),
            }))?;
        }
    }

    Ok(())
}

/// Load configuration, install logging and build the client.
fn build_client(environment: Option<Environment>, mode: InitiationMode) -> Result<EsewaClient> {
    let mut app_config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&app_config.log_level);

    if let Some(environment) = environment {
        app_config.gateway.environment = environment;
    }
    app_config.gateway.initiation_mode = mode;

    EsewaClient::new(app_config.gateway).context("Invalid gateway configuration")
}

fn init_tracing(default_filter: &str) {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
