mod inspect;
mod run;

pub use inspect::InspectReport;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Run(args) => run::run(args, cli.format, cli.pretty).await,
        Command::Inspect(args) => inspect::run(args, cli.format, cli.pretty),
    }
}
