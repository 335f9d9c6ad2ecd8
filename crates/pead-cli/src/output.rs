use pead_core::summary::render_results_table;
use pead_core::{Dropped, JoinedEvent, SavedRun};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::commands::InspectReport;
use crate::error::CliError;

pub fn render_run(saved: &SavedRun, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => render_json(saved, pretty),
        OutputFormat::Table => {
            render_run_table(saved);
            Ok(())
        }
    }
}

pub fn render_inspect(
    report: &InspectReport,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => render_json(report, pretty),
        OutputFormat::Table => {
            render_inspect_table(report);
            Ok(())
        }
    }
}

fn render_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), CliError> {
    let payload = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{payload}");
    Ok(())
}

fn render_run_table(saved: &SavedRun) {
    let report = &saved.report;

    println!("fetch_window: {}", report.fetch_window);
    println!(
        "tickers     : {}",
        report
            .tickers
            .iter()
            .map(|ticker| ticker.as_str())
            .collect::<Vec<_>>()
            .join(",")
    );
    println!("prices      : {}", report.price_observations);
    println!();

    println!("Joined events ({}):", report.joined.len());
    print_joined(&report.joined);
    println!();

    println!("Top {} by CAR:", report.top.len());
    print!("{}", render_results_table(&report.top));
    println!();

    println!("Average CAR by surprise category:");
    println!("{:<17} {:>10} {:>6}", "Surprise_Category", "Mean_CAR", "Count");
    for stats in &report.category_stats {
        println!(
            "{:<17} {:>10.4} {:>6}",
            stats.category.as_str(),
            stats.mean_car,
            stats.count
        );
    }
    println!();

    println!("Narrative summary:");
    println!("{}", report.summary);
    println!();
    println!("summary saved to {}", saved.summary_path.display());

    if !report.fetch_failures.is_empty() {
        println!();
        println!("fetch failures:");
        for failure in &report.fetch_failures {
            println!("  - {}: {} ({})", failure.ticker, failure.error, failure.error.code());
        }
    }
    print_dropped(&report.dropped);
}

fn render_inspect_table(report: &InspectReport) {
    println!("input       : {}", report.input);
    println!("records     : {}", report.records);
    println!(
        "tickers     : {}",
        report
            .tickers
            .iter()
            .map(|ticker| ticker.as_str())
            .collect::<Vec<_>>()
            .join(",")
    );
    match &report.report_dates {
        Some(range) => println!("report_dates: {range}"),
        None => println!("report_dates: -"),
    }
    print_dropped(&report.dropped);
}

fn print_joined(events: &[JoinedEvent]) {
    println!(
        "{:<8} {:<10} {:>10} {:>13} {:>12} {:>12} {:>12} {:>12}",
        "Ticker",
        "Date",
        "EPS_Actual",
        "EPS_Consensus",
        "Before_Date",
        "Price_Before",
        "After_Date",
        "Price_After"
    );
    for event in events {
        println!(
            "{:<8} {:<10} {:>10.4} {:>13.4} {:>12} {:>12.2} {:>12} {:>12.2}",
            event.ticker.as_str(),
            event.report_date.format_iso(),
            event.eps_actual,
            event.eps_consensus,
            event.price_before_date.format_iso(),
            event.price_before,
            event.price_after_date.format_iso(),
            event.price_after
        );
    }
}

fn print_dropped(dropped: &[Dropped]) {
    if dropped.is_empty() {
        return;
    }

    println!();
    println!("dropped ({}):", dropped.len());
    for record in dropped {
        println!("  - {record}");
    }
}
