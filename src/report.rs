//! Summaries of temporal test runs: a console table and `metadata.json`.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use console::Style;
use serde::Serialize;

use crate::defaults::METADATA_FILE_NAME;
use crate::error::Result;
use crate::temporal::TrialResult;

/// Counts over a set of trial results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub with_differences: usize,
}

impl Summary {
    pub fn from_results(results: &[TrialResult]) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            with_differences: results.iter().filter(|r| r.has_differences).count(),
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Serialize)]
struct Metadata<'a> {
    timestamp: String,
    total_tests: usize,
    passed: usize,
    failed: usize,
    differences_found: usize,
    results: &'a [TrialResult],
}

fn paint(text: &str, style: Style, use_color: bool) -> String {
    if use_color {
        style.force_styling(true).apply_to(text).to_string()
    } else {
        text.to_string()
    }
}

fn details(result: &TrialResult) -> String {
    if !result.success {
        return result
            .error
            .as_deref()
            .and_then(|e| e.lines().next())
            .unwrap_or("unknown error")
            .to_string();
    }
    if result.has_differences {
        let patch = result
            .diff_path
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "N/A".to_string());
        format!("Diff: {}", patch)
    } else {
        "No changes detected".to_string()
    }
}

/// Render the results table followed by the totals.
pub fn render_summary(results: &[TrialResult], use_color: bool) -> String {
    let name_width = results
        .iter()
        .map(|r| r.snapshot_name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Snapshot".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}\n",
        paint("Temporal Test Results", Style::new().bold(), use_color)
    );
    let header = format!(
        "{:<6}  {:<name_width$}  {:<7}  {:>5}  {}",
        "Status", "Snapshot", "Changes", "Files", "Details"
    );
    let _ = writeln!(out, "{}", paint(&header, Style::new().bold().magenta(), use_color));

    for result in results {
        let status = match (result.success, use_color) {
            (true, true) => paint("✓ PASS", Style::new().green().bold(), true),
            (false, true) => paint("✗ FAIL", Style::new().red().bold(), true),
            (true, false) => format!("{:<6}", "PASS"),
            (false, false) => format!("{:<6}", "FAIL"),
        };
        let changes = if result.has_differences {
            paint(&format!("{:<7}", "YES"), Style::new().yellow(), use_color)
        } else {
            paint(&format!("{:<7}", "NO"), Style::new().green(), use_color)
        };
        let name = paint(
            &format!("{:<name_width$}", result.snapshot_name),
            Style::new().cyan(),
            use_color,
        );
        let details = if result.success {
            details(result)
        } else {
            paint(&details(result), Style::new().red(), use_color)
        };
        let _ = writeln!(
            out,
            "{}  {}  {}  {:>5}  {}",
            status,
            name,
            changes,
            result.file_count(),
            details
        );
    }

    let summary = Summary::from_results(results);
    let failed_style = if summary.failed > 0 {
        Style::new().red()
    } else {
        Style::new().green()
    };
    let diff_style = if summary.with_differences > 0 {
        Style::new().yellow()
    } else {
        Style::new().green()
    };
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{}",
        paint(
            &format!("Total Tests: {}", summary.total),
            Style::new().bold(),
            use_color
        )
    );
    let _ = writeln!(
        out,
        "{}  {}",
        paint(
            &format!("Passed: {}", summary.passed),
            Style::new().green(),
            use_color
        ),
        paint(
            &format!("Failed: {}", summary.failed),
            failed_style,
            use_color
        )
    );
    let _ = writeln!(
        out,
        "{}",
        paint(
            &format!("Snapshots with Differences: {}", summary.with_differences),
            diff_style,
            use_color
        )
    );
    out
}

/// Write the machine-readable run summary to `path`.
pub fn save_metadata(results: &[TrialResult], path: &Path) -> Result<()> {
    let summary = Summary::from_results(results);
    let metadata = Metadata {
        timestamp: chrono::Local::now().to_rfc3339(),
        total_tests: summary.total,
        passed: summary.passed,
        failed: summary.failed,
        differences_found: summary.with_differences,
        results,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(&metadata)?)?;
    Ok(())
}

/// Print the summary and write `<output_dir>/metadata.json`.
///
/// Returns the path of the metadata file.
pub fn generate_summary_report(
    results: &[TrialResult],
    output_dir: &Path,
    use_color: bool,
) -> Result<PathBuf> {
    println!();
    print!("{}", render_summary(results, use_color));
    println!();

    let metadata_path = output_dir.join(METADATA_FILE_NAME);
    save_metadata(results, &metadata_path)?;
    println!(
        "{}",
        paint(
            &format!("Metadata saved to: {}", metadata_path.display()),
            Style::new().dim(),
            use_color
        )
    );
    Ok(metadata_path)
}
