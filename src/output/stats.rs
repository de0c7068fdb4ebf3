//! Statistics derived from a finished crawl
//!
//! This module summarizes a `CrawlReport` into counts and rates and prints
//! them to stdout.

use crate::crawler::CrawlReport;
use crate::state::{empty_fields, CycleOutcome};

/// Crawl statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlStatistics {
    /// Cycles that finished, whatever their outcome
    pub total_cycles: usize,

    /// Cycles that produced a page record
    pub recorded_cycles: usize,

    /// Cycles skipped without network traffic
    pub skipped_cycles: usize,

    /// Cycles that failed after fetching started
    pub failed_cycles: usize,

    /// Documents that were attempted but produced no record
    pub documents_rejected: usize,

    /// Tracked fields (or nested members) that are still empty
    pub empty_fields: Vec<String>,
}

impl CrawlStatistics {
    pub fn from_report(report: &CrawlReport) -> Self {
        let count = |pred: fn(&CycleOutcome) -> bool| -> usize {
            report
                .cycles
                .iter()
                .filter(|(outcome, _)| pred(outcome))
                .map(|(_, n)| n)
                .sum()
        };

        Self {
            total_cycles: report.cycles.values().sum(),
            recorded_cycles: count(CycleOutcome::is_success),
            skipped_cycles: count(CycleOutcome::is_skipped),
            failed_cycles: count(CycleOutcome::is_error),
            documents_rejected: report
                .documents_attempted
                .saturating_sub(report.documents_recorded),
            empty_fields: empty_fields(&report.fields),
        }
    }

    /// Share of fetched cycles (skips excluded) that produced a record
    pub fn success_rate(&self) -> f64 {
        let fetched = self.recorded_cycles + self.failed_cycles;
        if fetched == 0 {
            0.0
        } else {
            (self.recorded_cycles as f64 / fetched as f64) * 100.0
        }
    }
}

/// Prints a crawl report to stdout in a formatted manner
pub fn print_report(report: &CrawlReport) {
    let stats = CrawlStatistics::from_report(report);

    println!("=== Crawl Report ===\n");

    println!("Session:");
    println!("  Institute: {}", report.institute_id);
    println!("  Start URL: {}", report.start_url);
    println!("  Outcome: {}", report.outcome);
    println!("  Duration: {:.1}s", report.elapsed().as_secs_f64());
    println!();

    println!("Acquired:");
    println!("  Pages recorded: {}", report.pages_recorded);
    println!(
        "  Documents recorded: {} ({} attempted, {} rejected)",
        report.documents_recorded, report.documents_attempted, stats.documents_rejected
    );
    println!("  Frontier remaining: {}", report.frontier_remaining);
    println!();

    if !report.cycles.is_empty() {
        println!("Cycles by Outcome:");
        let mut cycle_counts: Vec<_> = report.cycles.iter().collect();
        cycle_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (outcome, count) in cycle_counts {
            println!("  {}: {}", outcome, count);
        }
        println!();
    }

    let filled = report.fields.len().saturating_sub(
        stats
            .empty_fields
            .iter()
            .filter(|name| !name.contains('.'))
            .count(),
    );
    println!("Fields: {} of {} populated", filled, report.fields.len());
    for name in &stats.empty_fields {
        println!("  - {} (empty)", name);
    }
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} fetched pages recorded)",
        stats.success_rate(),
        stats.recorded_cycles,
        stats.recorded_cycles + stats.failed_cycles
    );
}
