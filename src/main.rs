use crate::core::system::System;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

mod core;
mod interface;
mod model;
mod utils;

#[derive(Parser)]
#[command(name = "tbackup-client")]
#[command(about = "Scheduled database backups shipped to a remote backup service")]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "./config.toml")]
    config: PathBuf,

    /// Queue an extraordinary run of the named schedule once online
    #[arg(long, value_name = "SCHEDULE")]
    run_now: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let system = match System::initialize(&cli.config).await {
        Ok(system) => system,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    let result = system.run(cli.run_now.as_deref()).await;
    system.terminate().await;
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
