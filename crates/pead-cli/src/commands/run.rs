use std::time::Duration;

use pead_core::{CalendarDate, Pipeline, PipelineConfig};
use time::OffsetDateTime;

use crate::cli::{OutputFormat, RunArgs};
use crate::error::CliError;
use crate::output;

pub async fn run(args: &RunArgs, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    let config = pipeline_config(args, PipelineConfig::from_env())?;
    if config.prices.api_key.is_none() {
        tracing::warn!("FDA_API_KEY is not set; every price request will fail");
    }

    let pipeline = Pipeline::from_config(config);
    let earnings = pipeline.load(&args.input)?;
    let saved = pipeline.run_and_save(earnings, today()).await?;

    output::render_run(&saved, format, pretty)
}

/// Applies command-line flags on top of the environment-derived configuration.
fn pipeline_config(args: &RunArgs, mut config: PipelineConfig) -> Result<PipelineConfig, CliError> {
    if !args.threshold.is_finite() || args.threshold < 0.0 {
        return Err(CliError::InvalidArgument(format!(
            "--threshold must be a non-negative number, got {}",
            args.threshold
        )));
    }

    config.columns = args.columns.to_columns();
    config.surprise_threshold = args.threshold;
    config.top_n = args.top;
    config.pacing = Duration::from_millis(args.pacing_ms);
    config.window_padding_days = args.padding_days;
    config.prices.timeout_ms = args.timeout_ms;
    config.output_dir = args.output_dir.clone();
    if let Some(model) = &args.model {
        config.chat.model = model.clone();
    }
    Ok(config)
}

/// Local calendar date, falling back to UTC when the offset is unavailable.
fn today() -> CalendarDate {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    CalendarDate::from_date(now.date())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;

    fn run_args(argv: &[&str]) -> RunArgs {
        let cli = Cli::try_parse_from(argv.iter().copied()).expect("parses");
        match cli.command {
            Command::Run(args) => args,
            Command::Inspect(_) => panic!("expected run command"),
        }
    }

    #[test]
    fn flags_override_environment_config() {
        let args = run_args(&[
            "pead",
            "run",
            "earnings.csv",
            "--top",
            "5",
            "--pacing-ms",
            "0",
            "--model",
            "gpt-4o-mini",
            "--output-dir",
            "reports",
        ]);
        let config = pipeline_config(&args, PipelineConfig::default()).expect("valid flags");

        assert_eq!(config.top_n, 5);
        assert_eq!(config.pacing, Duration::ZERO);
        assert_eq!(config.chat.model, "gpt-4o-mini");
        assert_eq!(config.output_dir, std::path::PathBuf::from("reports"));
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let args = run_args(&["pead", "run", "earnings.csv", "--threshold=-0.5"]);
        let error = pipeline_config(&args, PipelineConfig::default()).expect_err("must fail");
        assert_eq!(error.exit_code(), 2);
    }
}
