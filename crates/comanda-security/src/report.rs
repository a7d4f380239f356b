//! Summary Report Generator
//!
//! Tallies the trailing day of security alerts into an aggregate report,
//! derives operator recommendations, and persists the result through the
//! report adapter.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;

use comanda_types::audit_adapter::{AuditAdapter, ListAlertOptions};
use comanda_types::report_adapter::{Recommendation, ReportAdapter, SecuritySummaryReport};
use comanda_types::utils::random_id;

use crate::config::SecurityConfig;
use crate::prelude::*;

/// Total alerts in-window above which a policy review is recommended
const REVIEW_POLICIES_THRESHOLD: u64 = 10;
/// Per-user alerts above which additional authentication is recommended
const PER_USER_ALERT_THRESHOLD: u64 = 3;

/// Periodic aggregate reporting over the audit trail
pub struct ReportGenerator {
	audit: Arc<dyn AuditAdapter>,
	reports: Arc<dyn ReportAdapter>,
	report_window_secs: i64,
}

impl ReportGenerator {
	pub fn new(
		config: &SecurityConfig,
		audit: Arc<dyn AuditAdapter>,
		reports: Arc<dyn ReportAdapter>,
	) -> Self {
		Self { audit, reports, report_window_secs: config.report_window_secs }
	}

	/// Generate and persist the daily summary report.
	///
	/// Reads all security alerts in the trailing window, tallies them by
	/// category, user, and address, and derives recommendations.
	pub async fn generate_daily_report(&self) -> ClResult<SecuritySummaryReport> {
		let window_end = Timestamp::now();
		let window_start = Timestamp(window_end.0 - self.report_window_secs);

		let alerts = self
			.audit
			.query_security_alerts(ListAlertOptions {
				since: Some(window_start),
				severities: None,
			})
			.await?;

		let mut counts_by_category: HashMap<Box<str>, u64> = HashMap::new();
		let mut counts_by_user: HashMap<Box<str>, u64> = HashMap::new();
		let mut counts_by_address: HashMap<Box<str>, u64> = HashMap::new();

		for alert in &alerts {
			*counts_by_category.entry(alert.category.clone()).or_insert(0) += 1;
			if let Some(user) = &alert.user_id {
				*counts_by_user.entry(user.clone()).or_insert(0) += 1;
			}
			if let Some(address) = &alert.address {
				*counts_by_address.entry(address.clone()).or_insert(0) += 1;
			}
		}

		let total_alerts = alerts.len() as u64;
		let mut recommendations = Vec::new();

		if total_alerts > REVIEW_POLICIES_THRESHOLD {
			recommendations.push(Recommendation {
				priority: "high".into(),
				message: "High alert volume in the last day; review security policies".into(),
			});
		}
		for (user, count) in &counts_by_user {
			if *count >= PER_USER_ALERT_THRESHOLD {
				recommendations.push(Recommendation {
					priority: "medium".into(),
					message: format!(
						"User {} triggered {} alerts; consider additional authentication",
						user, count
					)
					.into(),
				});
			}
		}

		let report = SecuritySummaryReport {
			report_id: random_id().unwrap_or_default(),
			generated_at: window_end,
			window_start,
			window_end,
			total_alerts,
			counts_by_category,
			counts_by_user,
			counts_by_address,
			recommendations,
		};

		self.reports.persist_report(&report).await?;
		if let Err(e) = self
			.audit
			.log_system_event(
				"security_report_generated",
				json!({ "reportId": report.report_id, "totalAlerts": total_alerts }),
			)
			.await
		{
			warn!("Failed to log report generation: {}", e);
		}

		info!("Generated security summary report ({} alerts)", total_alerts);
		Ok(report)
	}
}


// vim: ts=4
