//! Job statistics display

use crate::state::JobStatus;
use crate::storage::JobStats;

/// Formats job counts per status with their share of the total
pub fn format_statistics(stats: &JobStats) -> String {
    let mut out = String::from("=== Crawl Job Statistics ===\n\n");
    out.push_str(&format!("Total jobs: {}\n", stats.total));

    for status in JobStatus::all_statuses() {
        let count = stats.count(status);
        let percentage = if stats.total > 0 {
            (count as f64 / stats.total as f64) * 100.0
        } else {
            0.0
        };
        out.push_str(&format!(
            "  {:<10} {:>6} ({:.1}%)\n",
            status.to_string(),
            count,
            percentage
        ));
    }

    out
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &JobStats) {
    print!("{}", format_statistics(stats));
}
