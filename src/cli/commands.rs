use clap::Args;
use tracing::info;

use super::{CommandExecute, OutputFormat, Result};
use crate::{
    client::{target::ANY_BROKER, Client},
    logdirs::{
        alter::alter,
        describe::describe,
        render::{render_log_dirs, render_moves},
    },
};

#[derive(Debug, Args)]
pub struct DescribeCommand {
    /// Topics to describe, `topic` for all partitions or `topic:0,1` for some; none describes every directory
    pub topics: Vec<String>,

    /// Broker to ask, negative asks the partition leaders of the whole cluster
    #[arg(short, long, default_value_t = ANY_BROKER, allow_negative_numbers = true)]
    pub broker: i32,
}

impl CommandExecute for DescribeCommand {
    async fn execute(&self, client: &Client, format: OutputFormat) -> Result<String> {
        let target = client.target(self.broker);
        let dirs = describe(&self.topics, client, target.as_ref()).await?;
        info!(dirs = dirs.len(), broker = self.broker, "Described log dirs");

        Ok(match format {
            OutputFormat::Text => render_log_dirs(&dirs),
            OutputFormat::Json => serde_json::to_string_pretty(&dirs)?,
        })
    }
}

#[derive(Debug, Args)]
pub struct AlterReplicasCommand {
    /// Moves as `topic:0,1=/destination/dir`
    #[arg(required = true, num_args = 1..)]
    pub moves: Vec<String>,

    /// Broker to ask, negative sends each move to the partition leader
    #[arg(short, long, default_value_t = ANY_BROKER, allow_negative_numbers = true)]
    pub broker: i32,
}

impl CommandExecute for AlterReplicasCommand {
    async fn execute(&self, client: &Client, format: OutputFormat) -> Result<String> {
        let target = client.target(self.broker);
        let outcomes = alter(&self.moves, target.as_ref()).await?;
        info!(partitions = outcomes.len(), broker = self.broker, "Altered replica log dirs");

        Ok(match format {
            OutputFormat::Text => render_moves(&outcomes),
            OutputFormat::Json => serde_json::to_string_pretty(&outcomes)?,
        })
    }
}
