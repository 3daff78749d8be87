//! Command line surface of the `logdirs` binary.

use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use thiserror::Error;
use tracing::debug;

use crate::{
    build_info::DEFAULT_CLIENT_ID,
    client::{Client, ClientBuilder},
};

mod commands;

pub use commands::{AlterReplicasCommand, DescribeCommand};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("unable to connect to the cluster: {0}")]
    Client(#[from] crate::client::error::Error),

    #[error(transparent)]
    LogDirs(#[from] crate::logdirs::Error),

    #[error("unable to encode output: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("command did not finish within {0:?}")]
    Timeout(Duration),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Runs one subcommand against a connected client and returns what should be printed.
#[allow(async_fn_in_trait)]
pub trait CommandExecute {
    async fn execute(&self, client: &Client, format: OutputFormat) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned table
    Text,

    /// Pretty-printed JSON of the normalized result
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "logdirs", version, about = "Inspect and relocate Kafka partition log directories")]
pub struct LogDirsCli {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Args, Clone)]
pub struct CommonArgs {
    /// Bootstrap brokers, comma separated
    #[arg(
        short = 'B',
        long,
        env = "LOGDIRS_BROKERS",
        value_delimiter = ',',
        default_value = "localhost:9092",
        global = true
    )]
    pub brokers: Vec<String>,

    /// Client ID sent with every request
    #[arg(long, env = "LOGDIRS_CLIENT_ID", default_value = DEFAULT_CLIENT_ID, global = true)]
    pub client_id: String,

    /// Largest response frame accepted from a broker, in bytes
    #[arg(long, default_value_t = 100 * 1024 * 1024, global = true)]
    pub max_message_size: usize,

    /// Seconds the whole command may take, including connecting
    #[arg(long, default_value_t = 30, global = true)]
    pub timeout: u64,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// Log more, repeat for even more
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl CommonArgs {
    pub async fn connect(&self) -> Result<Client> {
        debug!(brokers = ?self.brokers, client_id = %self.client_id, "Connecting");
        let client = ClientBuilder::new(self.brokers.clone())
            .client_id(self.client_id.as_str())
            .max_message_size(self.max_message_size)
            .build()
            .await?;
        Ok(client)
    }

    /// Default log filter for the verbosity flag.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Describe the log directories of brokers
    #[command(visible_alias = "log-dirs")]
    Describe(DescribeCommand),

    /// Move partition replicas to other log directories
    #[command(visible_alias = "replica-log-dirs")]
    AlterReplicas(AlterReplicasCommand),
}

impl CommandExecute for Commands {
    async fn execute(&self, client: &Client, format: OutputFormat) -> Result<String> {
        match self {
            Commands::Describe(value) => value.execute(client, format).await,
            Commands::AlterReplicas(value) => value.execute(client, format).await,
        }
    }
}

impl LogDirsCli {
    /// Connects and runs the selected command, bounded by `--timeout`.
    pub async fn run(&self) -> Result<String> {
        let deadline = Duration::from_secs(self.common.timeout);
        tokio::time::timeout(deadline, async {
            let client = self.common.connect().await?;
            self.command.execute(&client, self.common.format).await
        })
        .await
        .map_err(|_| Error::Timeout(deadline))?
    }
}
