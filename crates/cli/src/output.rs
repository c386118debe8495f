// Report rendering: table or JSON on stdout

use anyhow::Result;
use colored::Colorize;
use fanout_core::BatchReport;
use serde::Serialize;
use tabled::{Table, Tabled};

/// Longest detail cell before it is cut
const MAX_DETAIL_CHARS: usize = 80;

#[derive(Tabled)]
struct Row {
    slot: u64,
    target: String,
    status: &'static str,
    elapsed_ms: u64,
    detail: String,
}

/// Build table rows; timed-out targets are listed after the results
fn rows<T>(report: &BatchReport<T>, detail: impl Fn(&T) -> String) -> Vec<Row> {
    let mut rows: Vec<Row> = report
        .results
        .iter()
        .map(|result| {
            let (status, text) = match &result.outcome {
                Ok(payload) => ("ok", detail(payload)),
                Err(e) => ("failed", e.to_string()),
            };
            Row {
                slot: result.slot_id.as_u64(),
                target: result.target.to_string(),
                status,
                elapsed_ms: result.elapsed_ms,
                detail: truncate(&text),
            }
        })
        .collect();
    rows.sort_by_key(|row| row.slot);

    rows.extend(report.timed_out.iter().map(|dropped| Row {
        slot: dropped.slot_id.as_u64(),
        target: dropped.target.to_string(),
        status: "timed out",
        elapsed_ms: dropped.elapsed_ms,
        detail: format!("abandoned while {}", dropped.last_state),
    }));
    rows
}

fn truncate(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or_default().trim();
    if first_line.chars().count() <= MAX_DETAIL_CHARS {
        return first_line.to_string();
    }
    let cut: String = first_line.chars().take(MAX_DETAIL_CHARS - 1).collect();
    format!("{}…", cut)
}

pub fn print_report<T: Serialize>(
    report: &BatchReport<T>,
    json: bool,
    detail: impl Fn(&T) -> String,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let rows = rows(report, detail);
    if !rows.is_empty() {
        println!("{}", Table::new(rows));
        println!();
    }

    let ok = report.successes().count();
    let failed = report.failures().count();
    let timed_out = report.timed_out.len();
    println!(
        "{} {} ok, {} failed, {} timed out ({} submitted, peak {} concurrent, {} ms)",
        "Batch".bold(),
        ok.to_string().green(),
        if failed > 0 { failed.to_string().red() } else { failed.to_string().normal() },
        if timed_out > 0 { timed_out.to_string().yellow() } else { timed_out.to_string().normal() },
        report.submitted,
        report.peak_concurrency,
        report.elapsed_ms,
    );
    Ok(())
}
