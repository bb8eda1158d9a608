//! Tweakctl - command-line front end for the Tweakwise engine.

use anyhow::Result;
use clap::Parser;
use tweakctl::{load_config, logging, App, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = load_config(&cli)?;
    let app = App::from_config(&config);
    let output = app.run(&cli.command).await?;
    print!("{}", output);

    Ok(())
}
