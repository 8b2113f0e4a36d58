use bridge_scripts::{cli::Cli, errors::ScriptError};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<(), ScriptError> {
    let Cli { global, command } = Cli::parse();

    tracing_subscriber::fmt().pretty().init();

    command.run(global).await
}
