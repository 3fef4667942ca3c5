use std::fmt::Write;

use comfy_table::{Cell, Color as TableColor};

use crate::report::{HealthReport, PushReport, RangeReport, Report};

use super::styling::{bright, bright_green, bright_red, bright_yellow, cyan, dim};
use super::tables::{
    color_coded_count_cell, color_coded_coverage_cell, color_coded_distance_cell,
    create_cyan_header, create_table,
};

/// Renders a human-readable summary of a report.
///
/// Color coding:
/// - Red: likely regressions, or any regression count above zero
/// - Yellow: possible regressions with a known distance
/// - Grey: possible regressions whose last passing run was not found
pub(super) fn render_report(report: &Report) -> String {
    match report {
        Report::Push(report) => render_push_report(report),
        Report::Health(report) => render_health_report(report),
        Report::Range(report) => render_range_report(report),
    }
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn join_or_none(labels: &[String]) -> String {
    if labels.is_empty() {
        "None".to_string()
    } else {
        labels.join("\n")
    }
}

fn render_push_report(report: &PushReport) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📊", "Overview");

    let backout = report.backedoutby.as_ref().map_or_else(
        || bright_green("no"),
        |by| bright_red(format!("yes, by {by}")),
    );

    let _ = write!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n\n",
        dim("Push:"),
        cyan(format!("{}:{} (#{})", report.branch, report.revision, report.pushid)),
        dim("Backed out:"),
        backout,
        dim("Tasks analyzed:"),
        bright_yellow(report.total_tasks),
        dim("Labels:"),
        bright_yellow(report.total_labels),
        dim("Total hours:"),
        bright_yellow(report.duration_hours),
        dim("Scheduled hours:"),
        bright_yellow(report.scheduled_duration_hours),
        dim("Analysis date:"),
        dim(report.collected_at.format("%Y-%m-%d %H:%M UTC")),
    );

    add_section_header(&mut output, "🔎", "Failures");
    let mut failures_table = create_table();
    failures_table.set_header(create_cyan_header(&["Failing", "Intermittent", "Candidates"]));
    failures_table.add_row(vec![
        Cell::new(join_or_none(&report.failing_labels)),
        Cell::new(join_or_none(&report.intermittent_labels)),
        Cell::new(join_or_none(&report.candidate_regressions)),
    ]);
    let _ = write!(output, "{failures_table}\n\n");

    add_section_header(&mut output, "🚨", "Regressions");
    if report.regressions.is_empty() {
        let _ = writeln!(output, "  {}", bright_green("No regressions found."));
        return output;
    }

    let mut regressions_table = create_table();
    regressions_table.set_header(create_cyan_header(&["#", "Label", "Confidence"]));
    for (idx, regression) in report.regressions.iter().enumerate() {
        regressions_table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(&regression.label),
            color_coded_distance_cell(regression.distance),
        ]);
    }
    let _ = write!(output, "{regressions_table}\n\n");

    let _ = writeln!(
        output,
        "  {} {} likely, {} possible (searched up to {} ancestors)",
        cyan("•"),
        bright_red(report.likely_count()),
        bright_yellow(report.possible_count()),
        report.max_depth,
    );

    output
}

fn render_health_report(report: &HealthReport) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "🩺", "Push Health");
    let _ = write!(
        output,
        "  {} {}\n\n",
        dim("Push:"),
        cyan(format!("{}:{}", report.branch, report.revision)),
    );

    let mut table = create_table();
    table.set_header(create_cyan_header(&[
        "Tasks Scheduled",
        "Tasks Total",
        "Unscheduled",
        "Percentage",
        "Hours (scheduled)",
        "Backed Out",
        "Possible",
        "Likely",
        "Caught",
        "Missed",
    ]));
    table.add_row(vec![
        Cell::new(report.tasks_scheduled),
        Cell::new(report.tasks_total),
        Cell::new(report.unscheduled_labels),
        color_coded_coverage_cell(report.percentage),
        Cell::new(report.scheduled_hours),
        Cell::new(if report.backed_out { "yes" } else { "no" }),
        color_coded_count_cell(report.possible_regressions),
        color_coded_count_cell(report.likely_regressions),
        Cell::new(report.caught),
        color_coded_count_cell(report.missed),
    ]);
    let _ = writeln!(output, "{table}");

    output
}

fn render_range_report(report: &RangeReport) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📅", "Pushes");
    let _ = write!(
        output,
        "  {} {}\n  {} {}\n\n",
        dim("Branch:"),
        cyan(&report.branch),
        dim("Pushes analyzed:"),
        bright_yellow(report.total_pushes),
    );

    if report.pushes.is_empty() {
        let _ = writeln!(output, "{}", bright_yellow("No pushes found."));
        return output;
    }

    let mut table = create_table();
    table.set_header(create_cyan_header(&[
        "Push",
        "Revision",
        "Author",
        "Labels",
        "Likely",
        "Possible",
    ]));

    for push in &report.pushes {
        let revision = push.revision.get(..12).unwrap_or(&push.revision);
        let likely_color = if push.likely_regressions.is_empty() {
            TableColor::DarkGrey
        } else {
            TableColor::Red
        };
        table.add_row(vec![
            Cell::new(push.pushid),
            Cell::new(revision),
            Cell::new(&push.user),
            Cell::new(push.task_labels),
            Cell::new(join_or_none(&push.likely_regressions)).fg(likely_color),
            Cell::new(join_or_none(&push.possible_regressions)),
        ]);
    }

    let _ = writeln!(output, "{table}");
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::RegressionDistance;
    use crate::report::{RangePush, Regression};
    use chrono::Utc;

    fn push_report(regressions: Vec<Regression>) -> PushReport {
        PushReport {
            revision: "abcdef123456".to_string(),
            branch: "autoland".to_string(),
            pushid: 42,
            backedoutby: None,
            collected_at: Utc::now(),
            total_tasks: 10,
            total_labels: 8,
            duration_hours: 3,
            scheduled_duration_hours: 2,
            failing_labels: vec!["test-a".to_string()],
            intermittent_labels: vec![],
            candidate_regressions: vec!["test-a".to_string()],
            max_depth: 5,
            regressions,
        }
    }

    #[test]
    fn test_render_push_report_without_regressions() {
        let output = render_push_report(&push_report(vec![]));

        assert!(output.contains("autoland:abcdef123456 (#42)"));
        assert!(output.contains("Tasks analyzed:"));
        assert!(output.contains("No regressions found"));
    }

    #[test]
    fn test_render_push_report_with_regressions() {
        let output = render_push_report(&push_report(vec![
            Regression {
                label: "test-a".to_string(),
                distance: RegressionDistance::Known(0),
                likely: true,
            },
            Regression {
                label: "test-b".to_string(),
                distance: RegressionDistance::Unknown,
                likely: false,
            },
        ]));

        assert!(output.contains("test-a"));
        assert!(output.contains("likely (0)"));
        assert!(output.contains("possible (unknown)"));
        assert!(output.contains("searched up to 5 ancestors"));
    }

    #[test]
    fn test_render_health_report() {
        let output = render_health_report(&HealthReport {
            revision: "abc".to_string(),
            branch: "autoland".to_string(),
            tasks_scheduled: 10,
            tasks_total: 40,
            unscheduled_labels: 3,
            percentage: 25.0,
            scheduled_hours: 4,
            backed_out: true,
            possible_regressions: 1,
            likely_regressions: 2,
            caught: 2,
            missed: 1,
        });

        assert!(output.contains("Tasks Scheduled"));
        assert!(output.contains("25.0%"));
        assert!(output.contains("Unscheduled"));
        assert!(output.contains("yes"));
    }

    #[test]
    fn test_render_range_report_truncates_revisions() {
        let output = render_range_report(&RangeReport {
            branch: "autoland".to_string(),
            collected_at: Utc::now(),
            total_pushes: 1,
            pushes: vec![RangePush {
                revision: "0123456789abcdef0123".to_string(),
                pushid: 7,
                user: "dev@example.com".to_string(),
                date: None,
                task_labels: 3,
                possible_regressions: vec![],
                likely_regressions: vec!["test-a".to_string()],
            }],
        });

        assert!(output.contains("0123456789ab"));
        assert!(!output.contains("0123456789abcdef0123"));
        assert!(output.contains("test-a"));
        assert!(output.contains("dev@example.com"));
    }

    #[test]
    fn test_render_empty_range_report() {
        let output = render_range_report(&RangeReport {
            branch: "autoland".to_string(),
            collected_at: Utc::now(),
            total_pushes: 0,
            pushes: vec![],
        });

        assert!(output.contains("No pushes found"));
    }
}
