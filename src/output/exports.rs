use anyhow::Result;
use std::io::Write;

use crate::config::OutputFormat;
use crate::report::{HealthReport, PushReport, RangeReport, Report};

use super::summary::render_report;

/// Writes a report in the requested format.
///
/// - Summary: colored tables for the terminal
/// - JSON: programmatic access
/// - CSV: spreadsheet analysis, one row per regression or push
pub fn export_report(
    report: &Report,
    format: OutputFormat,
    pretty: bool,
    output: &mut dyn Write,
) -> Result<()> {
    match format {
        OutputFormat::Summary => {
            writeln!(output, "{}", render_report(report))?;
            Ok(())
        }
        OutputFormat::Json => export_json(report, pretty, output),
        OutputFormat::Csv => match report {
            Report::Push(report) => export_push_csv(report, output),
            Report::Health(report) => export_health_csv(report, output),
            Report::Range(report) => export_range_csv(report, output),
        },
    }
}

fn export_json(report: &Report, pretty: bool, output: &mut dyn Write) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };
    writeln!(output, "{json}")?;
    Ok(())
}

/// Quotes a field, doubling embedded quotes.
fn quoted(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn export_push_csv(report: &PushReport, output: &mut dyn Write) -> Result<()> {
    writeln!(output, "Revision,Branch,Label,Distance,Likely")?;
    for regression in &report.regressions {
        writeln!(
            output,
            "{},{},{},{},{}",
            report.revision,
            quoted(&report.branch),
            quoted(&regression.label),
            regression.distance,
            regression.likely
        )?;
    }
    Ok(())
}

fn export_health_csv(report: &HealthReport, output: &mut dyn Write) -> Result<()> {
    writeln!(output, "Revision,Branch,Tasks Scheduled,Tasks Total,Unscheduled Labels,Percentage,Scheduled Hours,Backed Out,Possible Regressions,Likely Regressions,Caught,Missed")?;
    writeln!(
        output,
        "{},{},{},{},{},{:.1},{},{},{},{},{},{}",
        report.revision,
        quoted(&report.branch),
        report.tasks_scheduled,
        report.tasks_total,
        report.unscheduled_labels,
        report.percentage,
        report.scheduled_hours,
        report.backed_out,
        report.possible_regressions,
        report.likely_regressions,
        report.caught,
        report.missed
    )?;
    Ok(())
}

fn export_range_csv(report: &RangeReport, output: &mut dyn Write) -> Result<()> {
    writeln!(output, "Push ID,Revision,User,Date,Task Labels,Likely Regressions,Possible Regressions")?;
    for push in &report.pushes {
        writeln!(
            output,
            "{},{},{},{},{},{},{}",
            push.pushid,
            push.revision,
            quoted(&push.user),
            push.date.map(|d| d.to_rfc3339()).unwrap_or_default(),
            push.task_labels,
            quoted(&push.likely_regressions.join(";")),
            quoted(&push.possible_regressions.join(";"))
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::RegressionDistance;
    use crate::report::{RangePush, Regression};
    use chrono::{TimeZone, Utc};

    fn export(report: &Report, format: OutputFormat, pretty: bool) -> String {
        let mut output = Vec::new();
        export_report(report, format, pretty, &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    fn create_push_report() -> Report {
        Report::Push(PushReport {
            revision: "abc123".to_string(),
            branch: "autoland".to_string(),
            pushid: 7,
            backedoutby: Some("def456".to_string()),
            collected_at: Utc::now(),
            total_tasks: 3,
            total_labels: 2,
            duration_hours: 1,
            scheduled_duration_hours: 1,
            failing_labels: vec!["test-linux64/opt-mochitest-1".to_string()],
            intermittent_labels: vec![],
            candidate_regressions: vec![
                "test-linux64/opt-mochitest-1".to_string(),
                "test \"quoted\"".to_string(),
            ],
            max_depth: 5,
            regressions: vec![
                Regression {
                    label: "test-linux64/opt-mochitest-1".to_string(),
                    distance: RegressionDistance::Known(0),
                    likely: true,
                },
                Regression {
                    label: "test \"quoted\"".to_string(),
                    distance: RegressionDistance::Unknown,
                    likely: false,
                },
            ],
        })
    }

    #[test]
    fn test_export_json_regressions() {
        let json = export(&create_push_report(), OutputFormat::Json, false);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["pushid"], 7);
        assert_eq!(value["backedoutby"], "def456");
        assert_eq!(value["regressions"][0]["distance"], 0);
        assert!(value["regressions"][1]["distance"].is_null());
    }

    #[test]
    fn test_export_json_pretty() {
        let json = export(&create_push_report(), OutputFormat::Json, true);
        assert!(json.contains("\n  \"revision\": \"abc123\""));
    }

    #[test]
    fn test_export_push_csv() {
        let csv = export(&create_push_report(), OutputFormat::Csv, false);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "Revision,Branch,Label,Distance,Likely");
        assert_eq!(
            lines[1],
            "abc123,\"autoland\",\"test-linux64/opt-mochitest-1\",0,true"
        );
        assert!(lines[2].contains("\"test \"\"quoted\"\"\""));
        assert!(lines[2].ends_with(",false"));
    }

    #[test]
    fn test_export_health_csv() {
        let report = Report::Health(HealthReport {
            revision: "abc123".to_string(),
            branch: "autoland".to_string(),
            tasks_scheduled: 1,
            tasks_total: 3,
            unscheduled_labels: 2,
            percentage: 33.3,
            scheduled_hours: 2,
            backed_out: false,
            possible_regressions: 0,
            likely_regressions: 1,
            caught: 1,
            missed: 0,
        });

        let csv = export(&report, OutputFormat::Csv, false);
        assert!(csv.contains("Tasks Scheduled"));
        assert!(csv.contains("abc123,\"autoland\",1,3,2,33.3,2,false,0,1,1,0"));
    }

    #[test]
    fn test_export_range_csv() {
        let report = Report::Range(RangeReport {
            branch: "autoland".to_string(),
            collected_at: Utc::now(),
            total_pushes: 1,
            pushes: vec![RangePush {
                revision: "abc123".to_string(),
                pushid: 9,
                user: "dev@example.com".to_string(),
                date: Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
                task_labels: 4,
                possible_regressions: vec!["a".to_string(), "b".to_string()],
                likely_regressions: vec![],
            }],
        });

        let csv = export(&report, OutputFormat::Csv, false);
        assert!(csv.contains("9,abc123,\"dev@example.com\",2024-01-02T03:04:05+00:00,4,\"\",\"a;b\""));
    }

    #[test]
    fn test_export_summary_renders_tables() {
        let summary = export(&create_push_report(), OutputFormat::Summary, false);
        assert!(summary.contains("Regressions"));
        assert!(summary.contains("likely (0)"));
    }
}
