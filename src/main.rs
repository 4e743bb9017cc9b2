//! bot-dispatch - Order matching and dispatch for conversational bots.

mod cli;

use bot_dispatch::config::Config;
use bot_dispatch::error::{DispatchError, Result};
use bot_dispatch::logging::{self, LogTarget};
use bot_dispatch::registry::{Dispatch, OrderRegistry};
use cli::{Cli, OutputFormat};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    logging::init(if cli.log_file {
        LogTarget::File
    } else {
        LogTarget::Stderr
    });

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let format = cli.parse_output_format().map_err(DispatchError::config)?;

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    cli.apply_overrides(&mut config.directive);

    let registry = OrderRegistry::new(&config);
    for rejected in registry.disabled() {
        warn!(order = %rejected.name, "Order disabled: {}", rejected.error);
    }

    if cli.help_text {
        println!("{}", registry.help_text(cli.header_limit));
        return Ok(());
    }

    if !cli.inputs.is_empty() {
        for input in &cli.inputs {
            let outcome = dispatch_one(&registry, input, cli.concurrent).await?;
            print_outcome(input, &outcome, format)?;
        }
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let outcome = dispatch_one(&registry, &line, cli.concurrent).await?;
        print_outcome(&line, &outcome, format)?;
    }

    Ok(())
}

async fn dispatch_one(registry: &OrderRegistry, input: &str, concurrent: bool) -> Result<Dispatch> {
    if concurrent {
        registry.dispatch_concurrent(input).await
    } else {
        Ok(registry.dispatch(input))
    }
}

fn print_outcome(input: &str, outcome: &Dispatch, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{outcome}"),
        OutputFormat::Json => {
            let value = serde_json::json!({ "input": input, "outcome": outcome });
            let line = serde_json::to_string(&value)
                .map_err(|e| DispatchError::internal(format!("Failed to encode outcome: {e}")))?;
            println!("{line}");
        }
    }
    Ok(())
}
