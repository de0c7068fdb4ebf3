//! Markdown summary generation
//!
//! Renders a finished crawl as a human-readable markdown document: session
//! information, acquisition counts, cycle outcomes, the extracted field map
//! and the list of acquired records.

use super::stats::CrawlStatistics;
use super::OutputResult;
use crate::crawler::CrawlReport;
use crate::storage::FileKind;
use std::fs;
use std::path::Path;

/// Writes the markdown summary of a report to `output_path`
///
/// Missing parent directories are created.
pub fn write_markdown_summary(report: &CrawlReport, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(report)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(output_path, markdown)?;

    Ok(())
}

/// Formats a crawl report as markdown
pub fn format_markdown_summary(report: &CrawlReport) -> OutputResult<String> {
    let stats = CrawlStatistics::from_report(report);
    let mut md = String::new();

    md.push_str("# Campus-Harvest Crawl Summary\n\n");

    md.push_str("## Session Information\n\n");
    md.push_str(&format!("- **Institute**: {}\n", report.institute_id));
    md.push_str(&format!("- **Start URL**: {}\n", report.start_url));
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", report.finished_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds\n",
        report.elapsed().as_secs_f64()
    ));
    md.push_str(&format!("- **Outcome**: {}\n\n", report.outcome));

    md.push_str("## Acquisition\n\n");
    md.push_str(&format!("- **Pages Recorded**: {}\n", report.pages_recorded));
    md.push_str(&format!(
        "- **Documents Recorded**: {}\n",
        report.documents_recorded
    ));
    md.push_str(&format!(
        "- **Documents Attempted**: {}\n",
        report.documents_attempted
    ));
    md.push_str(&format!(
        "- **Frontier Remaining**: {}\n",
        report.frontier_remaining
    ));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        stats.success_rate()
    ));

    if !report.cycles.is_empty() {
        md.push_str("## Cycle Outcomes\n\n");
        md.push_str("| Outcome | Count |\n");
        md.push_str("|---------|-------|\n");
        for (outcome, count) in &report.cycles {
            md.push_str(&format!("| {} | {} |\n", outcome, count));
        }
        md.push('\n');
    }

    md.push_str("## Extracted Fields\n\n");
    if report.fields.is_empty() {
        md.push_str("No fields tracked.\n\n");
    } else {
        md.push_str("```json\n");
        md.push_str(&serde_json::to_string_pretty(&report.fields)?);
        md.push_str("\n```\n\n");

        if !stats.empty_fields.is_empty() {
            md.push_str(&format!("Still empty: {}\n\n", stats.empty_fields.join(", ")));
        }
    }

    for (kind, heading) in [(FileKind::Html, "Pages"), (FileKind::Pdf, "Documents")] {
        let records: Vec<_> = report
            .records
            .iter()
            .filter(|r| r.file_type == kind)
            .collect();
        if records.is_empty() {
            continue;
        }

        md.push_str(&format!("## {}\n\n", heading));
        md.push_str("| Title | URL | Stored At |\n");
        md.push_str("|-------|-----|-----------|\n");
        for record in records {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                escape_cell(&record.title),
                record.actual_url,
                record.storage_url
            ));
        }
        md.push('\n');
    }

    Ok(md)
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
