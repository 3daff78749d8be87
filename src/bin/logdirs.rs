use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use logdirs::cli::LogDirsCli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = LogDirsCli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.common.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.run().await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
