//! vBase CLI - object commitment and verification
//!
//! Commit content identifiers to a vBase commitment service and verify
//! recorded commitments against a timestamp, either directly through a
//! blockchain node or through the vBase forwarder API.

use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use tracing::Level;

mod cid;
mod client;
mod commands;
mod config;
mod crypto;
mod error;
mod forwarder;
mod models;
mod node;
mod timestamp;

use commands::{add_object, verify_object};
use config::ServiceOptions;
use error::CliError;

/// vBase CLI for object commitment and verification
#[derive(Parser, Debug)]
#[command(name = "vbase")]
#[command(author = "PIT Labs, Inc.")]
#[command(version)]
#[command(about = "vBase CLI for object commitment and verification", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interact with a commitment service, through a node or a forwarder
    #[command(visible_alias = "cs")]
    CommitmentService(CommitmentServiceArgs),

    /// Show configuration
    Config {
        /// Show config file path only
        #[arg(long)]
        path: bool,

        #[command(flatten)]
        service: ServiceArgs,
    },
}

#[derive(Args, Debug)]
struct CommitmentServiceArgs {
    #[command(flatten)]
    service: ServiceArgs,

    #[command(subcommand)]
    command: ServiceCommands,
}

/// Connection options; each falls back to its VBASE_* variable, then the config file
#[derive(Args, Debug)]
struct ServiceArgs {
    /// vBase commitment service node RPC URL
    #[arg(
        long,
        env = config::ENV_NODE_RPC_URL,
        help_heading = "Node commitment service options"
    )]
    vb_cs_node_rpc_url: Option<String>,

    /// vBase commitment service smart contract address
    #[arg(
        long,
        env = config::ENV_ADDRESS,
        help_heading = "Node commitment service options"
    )]
    vb_cs_address: Option<String>,

    /// vBase forwarder URL
    #[arg(
        long,
        env = config::ENV_FORWARDER_URL,
        help_heading = "Forwarder commitment service options"
    )]
    vb_forwarder_url: Option<String>,

    /// vBase API key
    #[arg(
        long,
        env = config::ENV_API_KEY,
        hide_env_values = true,
        help_heading = "Forwarder commitment service options"
    )]
    vb_api_key: Option<String>,

    /// Private key; required for adding objects, optional for verifying
    #[arg(
        long,
        env = config::ENV_PRIVATE_KEY,
        hide_env_values = true,
        help_heading = "Commitment service private key options"
    )]
    vb_cs_private_key: Option<String>,
}

impl From<ServiceArgs> for ServiceOptions {
    fn from(args: ServiceArgs) -> Self {
        ServiceOptions {
            node_rpc_url: args.vb_cs_node_rpc_url,
            address: args.vb_cs_address,
            private_key: args.vb_cs_private_key,
            forwarder_url: args.vb_forwarder_url,
            api_key: args.vb_api_key,
        }
    }
}

/// Where the object CID comes from; exactly one is required
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct ObjectCidArgs {
    /// Specify object CID
    #[arg(long)]
    object_cid: Option<String>,

    /// Read object CID from stdin
    #[arg(long)]
    object_cid_stdin: bool,
}

#[derive(Subcommand, Debug)]
enum ServiceCommands {
    /// Create an object commitment
    #[command(visible_alias = "ao")]
    AddObject {
        #[command(flatten)]
        cid: ObjectCidArgs,
    },

    /// Verify an object commitment against a timestamp
    #[command(visible_alias = "vo")]
    VerifyObject {
        #[command(flatten)]
        cid: ObjectCidArgs,

        /// Commitment timestamp (RFC 3339, 'YYYY-MM-DD HH:MM:SS+00:00' or Unix seconds)
        #[arg(long)]
        timestamp: String,

        /// Allowed distance from the recorded timestamp (e.g. 1s, 500ms, 2m)
        #[arg(long, default_value = timestamp::DEFAULT_TOLERANCE)]
        timestamp_tol: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(log_level(cli.verbose).into()),
        )
        .init();
    tracing::debug!("Logging initialized at DEBUG level.");
    tracing::info!("Logging initialized at INFO level.");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(err),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::CommitmentService(args) => {
            let file = config::load_config()?;
            let opts = ServiceOptions::resolve(args.service.into(), &file);

            match args.command {
                ServiceCommands::AddObject { cid } => {
                    add_object::execute(
                        &opts,
                        cid.object_cid,
                        cid.object_cid_stdin,
                        std::io::stdin(),
                    )
                    .await?;
                }

                ServiceCommands::VerifyObject {
                    cid,
                    timestamp,
                    timestamp_tol,
                } => {
                    verify_object::execute(
                        &opts,
                        cid.object_cid,
                        cid.object_cid_stdin,
                        &timestamp,
                        &timestamp_tol,
                        std::io::stdin(),
                    )
                    .await?;
                }
            }
        }

        Commands::Config { path, service } => {
            commands::config::execute(path, service.into())?;
        }
    }

    Ok(())
}

/// Print an error and pick the exit status
fn report(err: anyhow::Error) -> ExitCode {
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        eprintln!("{} {}", "Error:".red().bold(), cli_err);
        if matches!(cli_err, CliError::Usage(_)) {
            eprintln!("Try 'vbase --help' for help.");
        }
        return cli_err.exit_code();
    }

    eprintln!("{} {:#}", "Error:".red().bold(), err);
    ExitCode::FAILURE
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    }
}
