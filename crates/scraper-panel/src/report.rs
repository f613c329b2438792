//! One-line text renderings of a session snapshot for the log.

use panel_core::formatting::{format_count, format_timestamp};
use panel_core::models::Statistics;
use panel_runtime::SessionSnapshot;

/// Summary of the session suitable for a single log line.
pub fn summary_line(snapshot: &SessionSnapshot) -> String {
    let job = if snapshot.status.running {
        "running"
    } else {
        "stopped"
    };
    let counters = match &snapshot.statistics {
        Some(stats) => statistics_line(stats),
        None => "statistics pending".to_string(),
    };
    let newest = snapshot
        .recent
        .first()
        .map(|r| format_timestamp(r.first_seen.as_deref()))
        .unwrap_or_else(|| "N/A".to_string());

    let mut line = format!(
        "[{}] job {} | {} | newest {}",
        snapshot.view, job, counters, newest
    );
    if snapshot.loading {
        line.push_str(" | busy");
    }
    if let Some(result) = &snapshot.export_result {
        line.push_str(" | ");
        line.push_str(result);
    }
    line
}

fn statistics_line(stats: &Statistics) -> String {
    format!(
        "{} businesses ({} this week, {} this month, {} categories)",
        format_count(stats.get("total_businesses")),
        format_count(stats.get("new_this_week")),
        format_count(stats.get("new_this_month")),
        format_count(stats.get("categories_count")),
    )
}
