use std::{fmt::Display, path::Path};

use colored::Colorize;
use tabled::Table;
use upgrade_scanner::report::{NetworkReport, SourceStatus, UpgradeKind};

pub(crate) fn print_network_header(network: &str, proxies: usize) {
    println!("\n{}", format!("**** {network} ({proxies} proxies)").bold().purple());
}

pub(crate) fn print_network_skipped(network: &str, reason: &dyn Display) {
    eprintln!("{}", format!("Skipping {network}: {reason:#}").yellow());
}

pub(crate) fn print_unknown_network(network: &str) {
    eprintln!("{}", format!("Network {network} is not in the registry").yellow());
}

pub(crate) fn print_report(report: &NetworkReport) {
    for upgrade in &report.upgrades {
        let headline = match upgrade.kind {
            UpgradeKind::Observed => format!("New implementation found for {}:", upgrade.name),
            UpgradeKind::Backfilled => {
                format!("Previous implementation recovered for {}:", upgrade.name)
            },
        };
        println!("{}", headline.bold().green());
        println!("  {}", format!("{:#x}", upgrade.implementation).cyan());
        match &upgrade.source {
            SourceStatus::Downloaded(path) => {
                println!("  {}", format!("source: {}", path.display()).dimmed())
            },
            SourceStatus::Failed(err) => {
                eprintln!("  {}", format!("source download failed: {err}").yellow())
            },
            SourceStatus::Skipped => (),
        }
    }

    for failure in &report.failures {
        eprintln!(
            "{}",
            format!("Error reading {} ({}): {}", failure.name, failure.proxy, failure.error).red()
        );
    }
    for failure in &report.backfill_failures {
        eprintln!(
            "{}",
            format!("No previous implementation for {}: {}", failure.name, failure.error).yellow()
        );
    }

    println!(
        "{}",
        format!(
            "  checked {}, new {}, failed {}, not configured {}",
            report.checked,
            report.upgrades.len(),
            report.failures.len(),
            report.unconfigured
        )
        .dimmed()
    );
}

pub(crate) fn print_summary(reports: &[NetworkReport], registry: &Path, dirty: bool, dry_run: bool) {
    let rows = reports.iter().flat_map(NetworkReport::summary_rows).collect::<Vec<_>>();
    if rows.is_empty() {
        println!("\n{}", "No new implementations".dimmed());
        return;
    }

    println!("\n{}\n", format!("{:#^100}", " Upgrades ").bold().purple());
    println!("{}", Table::new(rows));

    if dirty && dry_run {
        println!("\n{}", format!("Dry run: {} left unchanged", registry.display()).yellow());
    } else if dirty {
        println!("\n{}", format!("Updated {}", registry.display()).green());
    }
}
