//! Login & Session Analyzer
//!
//! Inspects recent authentication history for brute-force, device-hopping,
//! and IP-hopping patterns, and watches session activity for concurrent
//! session abuse. All alerts raised here are advisory: they are logged for
//! the dispatcher and operators but never deny the triggering action.
//! The hard denial lives in the action rate limit, not here.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;

use comanda_types::audit_adapter::{AuditAdapter, ListActivityOptions, SecurityAlert};
use comanda_types::session_adapter::SessionAdapter;
use comanda_types::types::Severity;
use comanda_types::utils::random_id;

use crate::config::SecurityConfig;
use crate::prelude::*;

pub const ACTIVITY_LOGIN_SUCCESS: &str = "login_success";
pub const ACTIVITY_LOGIN_FAILED: &str = "login_failed";
pub const ACTIVITY_SESSION: &str = "session_activity";

/// What the analyzer saw in the trailing window for a login attempt
#[derive(Debug, Clone, Default)]
pub struct LoginAnalysis {
	/// Failed attempts in-window, including the current one if it failed
	pub failed_attempts: u32,
	/// Distinct originating addresses in-window, including the current one
	pub distinct_addresses: u32,
	/// Whether the device fingerprint has never previously succeeded
	pub new_device: bool,
}

/// Result of a login evaluation
#[derive(Debug, Clone, Default)]
pub struct LoginEvaluation {
	/// Advisory alerts raised (already appended to the audit trail)
	pub alerts: Vec<SecurityAlert>,
	pub analysis: LoginAnalysis,
}

/// Result of a session activity evaluation
#[derive(Debug, Clone, Default)]
pub struct SessionEvaluation {
	pub alerts: Vec<SecurityAlert>,
	/// Active session count at evaluation time
	pub active_sessions: usize,
}

/// Authentication and session anomaly detection
pub struct LoginAnalyzer {
	audit: Arc<dyn AuditAdapter>,
	sessions: Arc<dyn SessionAdapter>,
	failed_login_threshold: u32,
	ip_change_threshold: u32,
	max_concurrent_sessions: usize,
	analysis_window_secs: i64,
}

impl LoginAnalyzer {
	pub fn new(
		config: &SecurityConfig,
		audit: Arc<dyn AuditAdapter>,
		sessions: Arc<dyn SessionAdapter>,
	) -> Self {
		Self {
			audit,
			sessions,
			failed_login_threshold: config.failed_login_alert_threshold,
			ip_change_threshold: config.suspicious_ip_changes,
			max_concurrent_sessions: config.max_concurrent_sessions,
			analysis_window_secs: config.analysis_window_secs,
		}
	}

	/// Evaluate a login attempt against the user's trailing history.
	///
	/// The attempt itself may not be persisted yet, so it is folded into
	/// the computed counts here.
	pub async fn evaluate_login(
		&self,
		user_id: &str,
		success: bool,
		address: &str,
		device: Option<&str>,
	) -> ClResult<LoginEvaluation> {
		let since = Timestamp::from_now(-self.analysis_window_secs);
		// History being unreachable must not fail the login path; analyze
		// what we have (the current attempt alone).
		let history = self
			.audit
			.query_activities(
				user_id,
				ListActivityOptions {
					kinds: Some(vec![ACTIVITY_LOGIN_SUCCESS.into(), ACTIVITY_LOGIN_FAILED.into()]),
					since: Some(since),
				},
			)
			.await
			.unwrap_or_else(|e| {
				warn!("Activity history unavailable for {}: {}", user_id, e);
				Vec::new()
			});

		let mut failed_attempts = u32::from(!success);
		let mut addresses: HashSet<&str> = HashSet::new();
		addresses.insert(address);
		let mut device_seen_succeeding = false;

		for record in &history {
			if record.kind.as_ref() == ACTIVITY_LOGIN_FAILED {
				failed_attempts = failed_attempts.saturating_add(1);
			}
			if let Some(addr) = record.address.as_deref() {
				addresses.insert(addr);
			}
			if record.kind.as_ref() == ACTIVITY_LOGIN_SUCCESS
				&& device.is_some()
				&& record.device.as_deref() == device
			{
				device_seen_succeeding = true;
			}
		}

		let analysis = LoginAnalysis {
			failed_attempts,
			distinct_addresses: u32::try_from(addresses.len()).unwrap_or(u32::MAX),
			new_device: device.is_some() && !device_seen_succeeding,
		};

		let mut alerts = Vec::new();

		if analysis.failed_attempts >= self.failed_login_threshold {
			alerts.push(self.make_alert(
				"excessive_failed_logins",
				user_id,
				address,
				json!({ "failedAttempts": analysis.failed_attempts }),
			));
		}
		if analysis.distinct_addresses >= self.ip_change_threshold {
			alerts.push(self.make_alert(
				"multiple_ip_addresses",
				user_id,
				address,
				json!({ "distinctAddresses": analysis.distinct_addresses }),
			));
		}
		if analysis.new_device && !success {
			alerts.push(self.make_alert(
				"new_device_failed_login",
				user_id,
				address,
				json!({ "device": device }),
			));
		}

		self.append_alerts(&alerts).await;
		Ok(LoginEvaluation { alerts, analysis })
	}

	/// Evaluate a session heartbeat for concurrent-session and IP-hopping
	/// anomalies. Advisory only.
	pub async fn evaluate_session_activity(
		&self,
		user_id: &str,
		session_id: &str,
		address: &str,
		device: Option<&str>,
	) -> ClResult<SessionEvaluation> {
		let active = self.sessions.query_active_sessions(user_id).await.unwrap_or_else(|e| {
			warn!("Session store unavailable for {}: {}", user_id, e);
			Vec::new()
		});
		let active_sessions = active.iter().filter(|s| s.is_active()).count();

		let mut alerts = Vec::new();

		if active_sessions > self.max_concurrent_sessions {
			alerts.push(self.make_alert(
				"excessive_concurrent_sessions",
				user_id,
				address,
				json!({ "activeSessions": active_sessions, "sessionId": session_id }),
			));
		}

		let since = Timestamp::from_now(-self.analysis_window_secs);
		let history = self
			.audit
			.query_activities(
				user_id,
				ListActivityOptions {
					kinds: Some(vec![ACTIVITY_SESSION.into()]),
					since: Some(since),
				},
			)
			.await
			.unwrap_or_default();

		let mut addresses: HashSet<&str> = HashSet::new();
		addresses.insert(address);
		for record in &history {
			if let Some(addr) = record.address.as_deref() {
				addresses.insert(addr);
			}
		}

		if u32::try_from(addresses.len()).unwrap_or(u32::MAX) >= self.ip_change_threshold {
			alerts.push(self.make_alert(
				"session_ip_hopping",
				user_id,
				address,
				json!({
					"distinctAddresses": addresses.len(),
					"sessionId": session_id,
					"device": device,
				}),
			));
		}

		self.append_alerts(&alerts).await;
		Ok(SessionEvaluation { alerts, active_sessions })
	}

	fn make_alert(
		&self,
		category: &str,
		user_id: &str,
		address: &str,
		details: serde_json::Value,
	) -> SecurityAlert {
		SecurityAlert {
			alert_id: random_id().unwrap_or_default(),
			category: category.into(),
			severity: Severity::Warning,
			user_id: Some(user_id.into()),
			address: Some(address.into()),
			connection_id: None,
			details: Some(details),
			created_at: Timestamp::now(),
		}
	}

	/// Append advisory alerts to the audit trail, best-effort
	async fn append_alerts(&self, alerts: &[SecurityAlert]) {
		for alert in alerts {
			if let Err(e) = self.audit.log_security_event(alert.clone()).await {
				warn!("Failed to log advisory alert {}: {}", alert.category, e);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use comanda_audit_adapter_memory::{
		FailingAuditAdapter, FailingSessionAdapter, MemoryAuditAdapter, MemorySessionAdapter,
	};
	use comanda_types::audit_adapter::ActivityRecord;
	use comanda_types::session_adapter::SessionRecord;

	fn analyzer(
		audit: Arc<MemoryAuditAdapter>,
		sessions: Arc<MemorySessionAdapter>,
	) -> LoginAnalyzer {
		LoginAnalyzer::new(&crate::config::SecurityConfig::default(), audit, sessions)
	}

	fn activity(user_id: &str, kind: &str, address: &str, device: Option<&str>) -> ActivityRecord {
		ActivityRecord {
			activity_id: comanda_types::utils::random_id().unwrap(),
			user_id: user_id.into(),
			kind: kind.into(),
			address: Some(address.into()),
			device: device.map(Into::into),
			session_id: None,
			created_at: Timestamp::now(),
		}
	}

	fn session(user_id: &str, session_id: &str) -> SessionRecord {
		SessionRecord {
			session_id: session_id.into(),
			user_id: user_id.into(),
			address: None,
			device: None,
			created_at: Timestamp::now(),
			expires_at: None,
			revoked: false,
		}
	}

	#[tokio::test]
	async fn test_excessive_failed_logins() {
		let audit = Arc::new(MemoryAuditAdapter::new());
		let analyzer = analyzer(Arc::clone(&audit), Arc::new(MemorySessionAdapter::new()));

		audit.push_activity(activity("alice", ACTIVITY_LOGIN_FAILED, "10.0.0.5", None));
		audit.push_activity(activity("alice", ACTIVITY_LOGIN_FAILED, "10.0.0.5", None));

		// Third failure, counting the current attempt
		let eval = analyzer.evaluate_login("alice", false, "10.0.0.5", None).await.unwrap();
		assert_eq!(eval.analysis.failed_attempts, 3);
		assert!(eval.alerts.iter().any(|a| a.category.as_ref() == "excessive_failed_logins"));
		// Alerts are already on the audit trail
		assert_eq!(audit.alerts_of("excessive_failed_logins").len(), 1);
	}

	#[tokio::test]
	async fn test_clean_login_raises_nothing() {
		let audit = Arc::new(MemoryAuditAdapter::new());
		let analyzer = analyzer(Arc::clone(&audit), Arc::new(MemorySessionAdapter::new()));

		audit.push_activity(activity(
			"alice",
			ACTIVITY_LOGIN_SUCCESS,
			"10.0.0.5",
			Some("laptop"),
		));

		let eval = analyzer.evaluate_login("alice", true, "10.0.0.5", Some("laptop")).await.unwrap();
		assert!(eval.alerts.is_empty());
		assert!(!eval.analysis.new_device);
		assert_eq!(eval.analysis.failed_attempts, 0);
	}

	#[tokio::test]
	async fn test_multiple_addresses_in_window() {
		let audit = Arc::new(MemoryAuditAdapter::new());
		let analyzer = analyzer(Arc::clone(&audit), Arc::new(MemorySessionAdapter::new()));

		audit.push_activity(activity("bob", ACTIVITY_LOGIN_SUCCESS, "10.0.0.1", None));
		audit.push_activity(activity("bob", ACTIVITY_LOGIN_SUCCESS, "10.0.0.2", None));

		let eval = analyzer.evaluate_login("bob", true, "10.0.0.3", None).await.unwrap();
		assert_eq!(eval.analysis.distinct_addresses, 3);
		assert!(eval.alerts.iter().any(|a| a.category.as_ref() == "multiple_ip_addresses"));
	}

	#[tokio::test]
	async fn test_new_device_failed_login() {
		let audit = Arc::new(MemoryAuditAdapter::new());
		let analyzer = analyzer(Arc::clone(&audit), Arc::new(MemorySessionAdapter::new()));

		audit.push_activity(activity(
			"carol",
			ACTIVITY_LOGIN_SUCCESS,
			"10.0.0.5",
			Some("laptop"),
		));

		let eval =
			analyzer.evaluate_login("carol", false, "10.0.0.5", Some("phone")).await.unwrap();
		assert!(eval.analysis.new_device);
		assert!(eval.alerts.iter().any(|a| a.category.as_ref() == "new_device_failed_login"));

		// Same device on a success raises nothing
		let eval =
			analyzer.evaluate_login("carol", true, "10.0.0.5", Some("laptop")).await.unwrap();
		assert!(!eval.analysis.new_device);
	}

	#[tokio::test]
	async fn test_excessive_concurrent_sessions() {
		let audit = Arc::new(MemoryAuditAdapter::new());
		let sessions = Arc::new(MemorySessionAdapter::new());
		let analyzer = analyzer(Arc::clone(&audit), Arc::clone(&sessions));

		// Default ceiling is 5 concurrent sessions
		for n in 0..6 {
			sessions.add_session(session("dave", &format!("s{}", n)));
		}

		let eval =
			analyzer.evaluate_session_activity("dave", "s0", "10.0.0.5", None).await.unwrap();
		assert_eq!(eval.active_sessions, 6);
		assert!(
			eval.alerts.iter().any(|a| a.category.as_ref() == "excessive_concurrent_sessions")
		);
	}

	#[tokio::test]
	async fn test_history_outage_degrades_to_current_attempt() {
		let analyzer = LoginAnalyzer::new(
			&crate::config::SecurityConfig::default(),
			Arc::new(FailingAuditAdapter),
			Arc::new(MemorySessionAdapter::new()),
		);

		// Evaluation still succeeds with only the current attempt to go on
		let eval = analyzer.evaluate_login("alice", false, "10.0.0.5", None).await.unwrap();
		assert_eq!(eval.analysis.failed_attempts, 1);
		assert_eq!(eval.analysis.distinct_addresses, 1);
		assert!(eval.alerts.is_empty());
	}

	#[tokio::test]
	async fn test_session_store_outage_degrades() {
		let audit = Arc::new(MemoryAuditAdapter::new());
		let analyzer = LoginAnalyzer::new(
			&crate::config::SecurityConfig::default(),
			audit,
			Arc::new(FailingSessionAdapter),
		);

		let eval =
			analyzer.evaluate_session_activity("alice", "s1", "10.0.0.5", None).await.unwrap();
		assert_eq!(eval.active_sessions, 0);
		assert!(eval.alerts.is_empty());
	}

	#[tokio::test]
	async fn test_session_ip_hopping() {
		let audit = Arc::new(MemoryAuditAdapter::new());
		let analyzer = analyzer(Arc::clone(&audit), Arc::new(MemorySessionAdapter::new()));

		audit.push_activity(activity("erin", ACTIVITY_SESSION, "10.0.0.1", None));
		audit.push_activity(activity("erin", ACTIVITY_SESSION, "10.0.0.2", None));

		let eval =
			analyzer.evaluate_session_activity("erin", "s1", "10.0.0.3", None).await.unwrap();
		assert!(eval.alerts.iter().any(|a| a.category.as_ref() == "session_ip_hopping"));
	}
}

// vim: ts=4
