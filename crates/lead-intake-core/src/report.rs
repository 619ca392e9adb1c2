//! Aggregate lead reporting.
//!
//! [`build_report`] turns the grouped rows from
//! [`LeadStore::report_rows`](crate::store::LeadStore::report_rows) into the
//! summary the `generate_lead_report` operation returns.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::IntakeError;
use crate::models::{ReportRow, CALL_TRACKING_SOURCE};

pub const DEFAULT_DATE_RANGE: &str = "30d";

/// Parse a `"<N>d"` range (the trailing `d` is optional) into a day count.
pub fn parse_date_range(range: &str) -> Result<i64, IntakeError> {
    let trimmed = range.trim();
    let digits = trimmed.strip_suffix(['d', 'D']).unwrap_or(trimmed);
    digits
        .parse::<u32>()
        .map(i64::from)
        .map_err(|_| IntakeError::invalid("date_range", format!("expected e.g. \"30d\", got {range:?}")))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    pub fn last_days(days: i64, end: DateTime<Utc>) -> Self {
        Self {
            start: end - Duration::days(days),
            end,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportFilters {
    pub source_filter: String,
    pub score_threshold: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total_leads: i64,
    pub qualified_leads: i64,
    pub qualification_rate: String,
    pub average_score: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceSummary {
    pub total_leads: i64,
    pub qualified_leads: i64,
    pub average_score: f64,
    pub by_status: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadReport {
    pub report_period: String,
    pub date_range: DateWindow,
    pub filters_applied: ReportFilters,
    pub summary: ReportSummary,
    pub by_source: BTreeMap<String, SourceSummary>,
    pub recommendations: Vec<String>,
}

fn one_decimal(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

pub fn build_report(
    rows: &[ReportRow],
    days: i64,
    window: DateWindow,
    source_filter: Option<&str>,
    score_threshold: i64,
) -> LeadReport {
    let total: i64 = rows.iter().map(|r| r.total_leads).sum();
    let qualified: i64 = rows.iter().map(|r| r.qualified_leads).sum();
    let score_sum: f64 = rows.iter().map(|r| r.avg_score * r.total_leads as f64).sum();

    let mut by_source: BTreeMap<String, SourceSummary> = BTreeMap::new();
    for row in rows {
        let entry = by_source.entry(row.source_system.clone()).or_default();
        entry.total_leads += row.total_leads;
        entry.qualified_leads += row.qualified_leads;
        // running sum; divided below
        entry.average_score += row.avg_score * row.total_leads as f64;
        *entry
            .by_status
            .entry(row.qualification_status.clone())
            .or_default() += row.total_leads;
    }
    for summary in by_source.values_mut() {
        if summary.total_leads > 0 {
            summary.average_score = one_decimal(summary.average_score / summary.total_leads as f64);
        }
    }

    let summary = ReportSummary {
        total_leads: total,
        qualified_leads: qualified,
        qualification_rate: if total > 0 {
            format!("{:.1}%", qualified as f64 / total as f64 * 100.0)
        } else {
            "0%".to_string()
        },
        average_score: if total > 0 {
            format!("{:.1}", score_sum / total as f64)
        } else {
            "0".to_string()
        },
    };

    let mut recommendations = Vec::new();
    if qualified * 10 < total * 3 {
        recommendations
            .push("Consider lowering qualification threshold or improving lead sources".to_string());
    }
    if by_source.contains_key(CALL_TRACKING_SOURCE) {
        recommendations.push(format!(
            "High-value source: Continue {CALL_TRACKING_SOURCE} optimization"
        ));
    }

    LeadReport {
        report_period: format!("Last {days} days"),
        date_range: window,
        filters_applied: ReportFilters {
            source_filter: source_filter.unwrap_or("All sources").to_string(),
            score_threshold,
        },
        summary,
        by_source,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(source: &str, status: &str, total: i64, avg: f64, qualified: i64) -> ReportRow {
        ReportRow {
            source_system: source.into(),
            qualification_status: status.into(),
            total_leads: total,
            avg_score: avg,
            qualified_leads: qualified,
        }
    }

    #[test]
    fn test_parse_date_range() {
        assert_eq!(parse_date_range("30d").unwrap(), 30);
        assert_eq!(parse_date_range(" 7 ").unwrap(), 7);
        assert_eq!(parse_date_range("90D").unwrap(), 90);
        assert!(parse_date_range("thirty").is_err());
        assert!(parse_date_range("-5d").is_err());
        assert!(parse_date_range("").is_err());
    }

    #[test]
    fn test_summary_and_recommendations() {
        let rows = vec![
            row("CallRail", "Hot Lead", 2, 90.0, 2),
            row("CallRail", "Cold Lead", 2, 20.0, 0),
            row("ActiveCampaign", "Unqualified", 6, 5.0, 0),
        ];
        let report = build_report(&rows, 30, DateWindow::last_days(30, Utc::now()), None, 50);
        assert_eq!(report.report_period, "Last 30 days");
        assert_eq!(report.summary.total_leads, 10);
        assert_eq!(report.summary.qualified_leads, 2);
        assert_eq!(report.summary.qualification_rate, "20.0%");
        // (180 + 40 + 30) / 10
        assert_eq!(report.summary.average_score, "25.0");
        assert_eq!(report.filters_applied.source_filter, "All sources");
        assert_eq!(
            report.recommendations,
            vec![
                "Consider lowering qualification threshold or improving lead sources",
                "High-value source: Continue CallRail optimization",
            ]
        );

        let callrail = &report.by_source["CallRail"];
        assert_eq!(callrail.total_leads, 4);
        assert_eq!(callrail.average_score, 55.0);
        assert_eq!(callrail.by_status["Hot Lead"], 2);
    }

    #[test]
    fn test_empty_report() {
        let report = build_report(&[], 7, DateWindow::last_days(7, Utc::now()), Some("CallRail"), 0);
        assert_eq!(report.summary.qualification_rate, "0%");
        assert_eq!(report.summary.average_score, "0");
        assert!(report.recommendations.is_empty());
        assert_eq!(report.filters_applied.source_filter, "CallRail");
    }
}
