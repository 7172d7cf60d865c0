use clap::Parser;
use id3tree::cli::{run, CliArgs};
use std::error::Error;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let args = CliArgs::parse();
    run(&args)?;
    Ok(())
}
