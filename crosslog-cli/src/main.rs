use clap::Parser;

use crosslog_cli::cli::{Cli, Commands};
use crosslog_cli::commands;
use crosslog_cli::error::CliError;
use crosslog_cli::logging;
use crosslog_cli::output::OutputWriter;
use crosslog_core::config::GeneralConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e}");
            e.exit_code()
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);
    crosslog_core::metrics::describe_all();

    match cli.command {
        Commands::Extensions => {
            init_logging(&logging::standalone_config(cli.log_level))?;
            commands::extensions::execute(&writer)
        }
        Commands::Check => {
            let config = commands::load_config(&cli.config, cli.log_level.as_deref()).await?;
            init_logging(&config.general)?;
            commands::check::execute(&config, &cli.config, &writer)
        }
        Commands::Replay(args) => {
            let config = commands::load_config(&cli.config, cli.log_level.as_deref()).await?;
            init_logging(&config.general)?;
            commands::replay::execute(args, &config, &writer).await
        }
    }
}

fn init_logging(general: &GeneralConfig) -> Result<(), CliError> {
    logging::init_tracing(general).map_err(|e| CliError::Command(e.to_string()))
}
