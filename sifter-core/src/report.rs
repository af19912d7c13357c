use crate::outcome::RunOutcome;
use crate::scrape::RunSummary;
use colored::Colorize;
use sifter_scanner::UniformRecord;

const DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Rows shown in the report preview
const PREVIEW_ROWS: usize = 5;

/// Generate the terminal summary for a finished run
pub fn generate_scrape_report(summary: &RunSummary) -> String {
    let mut report = String::new();
    report.push_str(DIVIDER);
    report.push_str("\n\n");

    report.push_str("# Summary:\n");
    report.push_str(&format!("  Target:          {}\n", summary.url));
    report.push_str(&format!("  Fields:          {}\n", summary.fields.join(", ")));
    report.push_str(&format!(
        "  Mode:            {} ({})\n",
        summary.mode,
        summary.engine.as_str()
    ));
    report.push_str(&format!(
        "  Started:         {}\n",
        summary.started_at.format("%Y-%m-%d %H:%M:%S")
    ));
    report.push_str(&format!(
        "  Duration:        {:.1}s\n",
        summary.elapsed.as_secs_f64()
    ));

    if let Some(ref traversal) = summary.traversal {
        report.push_str(&format!("  Pages visited:   {}\n", traversal.pages_visited));
        report.push_str(&format!("  Records:         {}\n", traversal.records.len()));
        if traversal.skipped_nodes > 0 {
            report.push_str(&format!(
                "  Skipped nodes:   {}\n",
                traversal.skipped_nodes.to_string().yellow()
            ));
        }
        if let Some(scroll) = traversal.scroll
            && !scroll.stable
        {
            report.push_str(&format!(
                "  {}\n",
                format!("Scrolling stopped after {} round(s) before the page settled", scroll.rounds)
                    .yellow()
            ));
        }
    }

    let files: Vec<_> = summary.files.paths().collect();
    if !files.is_empty() {
        report.push_str("\n# Output:\n");
        for path in files {
            report.push_str(&format!("  {}\n", path.display()));
        }
    }

    if let Some(ref traversal) = summary.traversal
        && !traversal.records.is_empty()
    {
        report.push_str("\n# Preview:\n");
        report.push_str(&preview_table(&traversal.columns, &traversal.records));
    }

    report.push('\n');
    report.push_str(DIVIDER);
    report.push_str("\n\n");

    let status = match summary.outcome {
        RunOutcome::Success => format!("✓ {}", summary.outcome).green().bold(),
        RunOutcome::NoData => format!("⚠ {}", summary.outcome).yellow().bold(),
        RunOutcome::Failed => format!("✗ {}", summary.outcome).red().bold(),
    };
    report.push_str(&format!("Status: {}\n", status));
    if let Some(ref error) = summary.error {
        report.push_str(&format!("  {}\n", error.to_string().red()));
    }

    report
}

/// First few records laid out as aligned columns
pub fn preview_table(columns: &[String], records: &[UniformRecord]) -> String {
    const MAX_CELL: usize = 32;

    let cell = |text: &str| -> String {
        if text.chars().count() > MAX_CELL {
            let cut: String = text.chars().take(MAX_CELL - 1).collect();
            format!("{}…", cut)
        } else {
            text.to_string()
        }
    };

    let rows: Vec<Vec<String>> = records
        .iter()
        .take(PREVIEW_ROWS)
        .map(|r| r.values().map(|v| cell(&v.to_string())).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|c| c.chars().count())
                .chain(std::iter::once(cell(name).chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: Vec<String>| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = w))
            .collect();
        format!("  {}\n", padded.join("  ").trim_end())
    };

    let mut out = String::new();
    out.push_str(&line(columns.iter().map(|c| cell(c)).collect()));
    for row in rows {
        out.push_str(&line(row));
    }
    if records.len() > PREVIEW_ROWS {
        out.push_str(&format!("  ... and {} more\n", records.len() - PREVIEW_ROWS));
    }
    out
}
