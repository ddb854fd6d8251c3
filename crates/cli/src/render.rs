//! Text rendering of reports for the terminal.

use std::fmt::Write as _;

use branchwatch_core::{AssessedRecord, BranchRegistry, BusinessClock, Limit, ObservedValue};
use branchwatch_monitor::{CheckKind, ChecklistReport, HealthReport};

pub fn health_report(
    report: &HealthReport,
    registry: &BranchRegistry,
    clock: &BusinessClock,
) -> String {
    let mut out = String::new();
    let at = clock.to_local(report.generated_at).format("%Y-%m-%d %H:%M");
    let _ = writeln!(out, "{} at {} ({})", report.check.title(), at, clock);
    let _ = writeln!(out, "Threshold: {}", threshold_phrase(report));
    let _ = writeln!(
        out,
        "Rows: {} read, {} retained, {} dropped",
        report.rows_read,
        report.rows_retained,
        report.diagnostics.len()
    );

    let c = &report.classification;
    if report.is_no_data() {
        let _ = writeln!(out, "\nNo data submitted.");
    } else {
        let _ = writeln!(
            out,
            "Healthy: {}  Unhealthy: {}  Missing: {}",
            c.healthy.len(),
            c.unhealthy.len(),
            c.missing.len()
        );
    }

    if !c.unhealthy.is_empty() {
        let _ = writeln!(out, "\nUnhealthy ({})", c.unhealthy.len());
        out.push_str(&assessed_table(report, &c.unhealthy, registry, clock, true));
    }
    if !c.missing.is_empty() {
        let _ = writeln!(out, "\nMissing ({})", c.missing.len());
        let rows = c
            .missing
            .iter()
            .map(|e| vec![e.branch_id.to_string(), e.english_name.clone()])
            .collect();
        out.push_str(&table(&["BRANCH", "NAME"], rows));
    }
    if !c.healthy.is_empty() {
        let _ = writeln!(out, "\nHealthy ({})", c.healthy.len());
        out.push_str(&assessed_table(report, &c.healthy, registry, clock, false));
    }
    if !report.diagnostics.is_empty() {
        let _ = writeln!(out, "\nDropped rows ({})", report.diagnostics.len());
        for d in &report.diagnostics {
            let _ = writeln!(out, "  {}", d);
        }
    }
    out
}

fn threshold_phrase(report: &HealthReport) -> String {
    let limit = report.policy.limit();
    match (report.check, limit) {
        (CheckKind::Uploads, Limit::Duration(_)) => {
            format!("more than {} since last upload", limit)
        }
        (CheckKind::Backups, Limit::Duration(_)) => {
            format!("more than {} since last backup", limit)
        }
        (_, Limit::Size(_)) => format!("log file larger than {}", limit),
        (_, Limit::Duration(_)) => format!("more than {}", limit),
    }
}

fn assessed_table(
    report: &HealthReport,
    records: &[AssessedRecord],
    registry: &BranchRegistry,
    clock: &BusinessClock,
    with_ping: bool,
) -> String {
    let show_ping = with_ping && !report.connectivity.is_empty();
    let rows = records
        .iter()
        .map(|a| {
            let id = a.branch_id();
            let mut row = vec![id.to_string(), registry.display_name(id).to_string()];
            match a.record.observed {
                ObservedValue::Timestamp(at) => {
                    row.push(clock.to_local(at).format("%Y-%m-%d %H:%M").to_string());
                    row.push(a.deviation.to_string());
                }
                ObservedValue::Size(_) => {
                    row.push(a.deviation.to_string());
                    row.push(a.record.extra.get("file_path").cloned().unwrap_or_default());
                }
            }
            if show_ping {
                let ping = match report.connectivity_for(id) {
                    Some(o) if o.reachable => "up",
                    Some(_) => "down",
                    None => "-",
                };
                row.push(ping.to_string());
            }
            row
        })
        .collect();

    let mut headers = match report.check {
        CheckKind::LogSizes => vec!["BRANCH", "NAME", "SIZE", "FILE PATH"],
        CheckKind::Uploads => vec!["BRANCH", "NAME", "LAST UPLOAD", "BEHIND BY"],
        CheckKind::Backups => vec!["BRANCH", "NAME", "LAST BACKUP", "BEHIND BY"],
    };
    if show_ping {
        headers.push("PING");
    }
    table(&headers, rows)
}

/// Left-aligned columns, two spaces apart, indented by two.
fn table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }
    let mut out = String::new();
    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    for row in std::iter::once(&header_cells).chain(rows.iter()) {
        let mut line = String::from(" ");
        for (cell, width) in row.iter().zip(&widths) {
            let pad = width.saturating_sub(cell.chars().count());
            let _ = write!(line, " {}{}", cell, " ".repeat(pad + 1));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

pub fn checklist(report: &ChecklistReport) -> String {
    let mut out = String::new();
    let overall = report.checklist.completion();
    if report.checklist.is_empty() {
        out.push_str("Opening checklist is empty.\n");
    } else {
        let _ = writeln!(
            out,
            "Opening checklist: {}/{} steps complete ({}%)",
            overall.done,
            overall.total,
            overall.percent()
        );
    }
    for category in &report.checklist.categories {
        let c = category.completion();
        let _ = writeln!(out, "\n{} ({}/{})", category.name, c.done, c.total);
        for step in &category.steps {
            let mark = if step.completed { "x" } else { " " };
            let _ = writeln!(out, "  [{}] {:>3}  {}", mark, step.step_id, step.description);
        }
    }
    if !report.diagnostics.is_empty() {
        let _ = writeln!(out, "\nDropped rows ({})", report.diagnostics.len());
        for d in &report.diagnostics {
            let _ = writeln!(out, "  {}", d);
        }
    }
    out
}
