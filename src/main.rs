use anyhow::Result;
use clap::Parser;
use null_model_validation::cli::{Cli, OutputFormat};
use null_model_validation::Validator;
use std::io;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let config = args.resolve_config()?;
    let mut validator = Validator::from_config(config);

    let result = match args.format {
        OutputFormat::Text => validator.run(&mut io::stdout().lock()),
        OutputFormat::Json => validator.run(&mut io::sink()),
    };

    match result {
        Ok(report) => {
            if args.format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            Ok(())
        }
        // A missing input is reported and the run ends without a figure
        Err(err) if err.is_input_missing() => {
            println!("Error: {}", err);
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
