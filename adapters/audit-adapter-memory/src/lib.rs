//! In-memory adapter implementations for the Comanda security engine.
//!
//! Backs the engine's integration tests and single-node deployments that
//! do not need a durable audit trail. Everything lives in process memory
//! and is lost on restart.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use comanda_types::audit_adapter::{
	ActivityRecord, AuditAdapter, ListActivityOptions, ListAlertOptions, SecurityAlert,
};
use comanda_types::prelude::*;
use comanda_types::report_adapter::{ReportAdapter, SecuritySummaryReport};
use comanda_types::session_adapter::{SessionAdapter, SessionRecord};

/// A recorded system event or internal error
#[derive(Debug, Clone)]
pub struct SystemEvent {
	pub kind: Box<str>,
	pub details: Value,
	pub created_at: Timestamp,
}

/// In-memory audit trail
#[derive(Debug, Default)]
pub struct MemoryAuditAdapter {
	alerts: RwLock<Vec<SecurityAlert>>,
	system_events: RwLock<Vec<SystemEvent>>,
	errors: RwLock<Vec<SystemEvent>>,
	activities: RwLock<Vec<ActivityRecord>>,
}

impl MemoryAuditAdapter {
	pub fn new() -> Self {
		Self::default()
	}

	/// Seed an activity record (normally written by the auth layer)
	pub fn push_activity(&self, record: ActivityRecord) {
		self.activities.write().push(record);
	}

	/// Snapshot of all logged alerts, oldest first
	pub fn alerts(&self) -> Vec<SecurityAlert> {
		self.alerts.read().clone()
	}

	/// Alerts of one category, oldest first
	pub fn alerts_of(&self, category: &str) -> Vec<SecurityAlert> {
		self.alerts.read().iter().filter(|a| a.category.as_ref() == category).cloned().collect()
	}

	/// Snapshot of all system events, oldest first
	pub fn system_events(&self) -> Vec<SystemEvent> {
		self.system_events.read().clone()
	}

	/// Snapshot of all recorded errors, oldest first
	pub fn errors(&self) -> Vec<SystemEvent> {
		self.errors.read().clone()
	}
}

#[async_trait]
impl AuditAdapter for MemoryAuditAdapter {
	async fn log_security_event(&self, alert: SecurityAlert) -> ClResult<()> {
		trace!("audit: {} ({})", alert.category, alert.severity);
		self.alerts.write().push(alert);
		Ok(())
	}

	async fn log_system_event(&self, kind: &str, details: Value) -> ClResult<()> {
		self.system_events.write().push(SystemEvent {
			kind: kind.into(),
			details,
			created_at: Timestamp::now(),
		});
		Ok(())
	}

	async fn log_error(&self, error: &str, context: Value) -> ClResult<()> {
		self.errors.write().push(SystemEvent {
			kind: error.into(),
			details: context,
			created_at: Timestamp::now(),
		});
		Ok(())
	}

	async fn query_activities(
		&self,
		user_id: &str,
		opts: ListActivityOptions,
	) -> ClResult<Vec<ActivityRecord>> {
		let mut result: Vec<ActivityRecord> = self
			.activities
			.read()
			.iter()
			.filter(|record| record.user_id.as_ref() == user_id)
			.filter(|record| {
				opts.kinds.as_ref().is_none_or(|kinds| kinds.contains(&record.kind))
			})
			.filter(|record| opts.since.is_none_or(|since| record.created_at >= since))
			.cloned()
			.collect();
		result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
		Ok(result)
	}

	async fn query_security_alerts(&self, opts: ListAlertOptions) -> ClResult<Vec<SecurityAlert>> {
		let mut result: Vec<SecurityAlert> = self
			.alerts
			.read()
			.iter()
			.filter(|alert| opts.since.is_none_or(|since| alert.created_at >= since))
			.filter(|alert| {
				opts.severities.as_ref().is_none_or(|sevs| sevs.contains(&alert.severity))
			})
			.cloned()
			.collect();
		result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
		Ok(result)
	}
}

/// In-memory session store view
#[derive(Debug, Default)]
pub struct MemorySessionAdapter {
	sessions: RwLock<Vec<SessionRecord>>,
}

impl MemorySessionAdapter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_session(&self, session: SessionRecord) {
		self.sessions.write().push(session);
	}

	pub fn revoke_all(&self, user_id: &str) {
		for session in self.sessions.write().iter_mut() {
			if session.user_id.as_ref() == user_id {
				session.revoked = true;
			}
		}
	}
}

#[async_trait]
impl SessionAdapter for MemorySessionAdapter {
	async fn query_active_sessions(&self, user_id: &str) -> ClResult<Vec<SessionRecord>> {
		Ok(self
			.sessions
			.read()
			.iter()
			.filter(|session| session.user_id.as_ref() == user_id && session.is_active())
			.cloned()
			.collect())
	}
}

/// In-memory report store
#[derive(Debug, Default)]
pub struct MemoryReportAdapter {
	reports: RwLock<Vec<SecuritySummaryReport>>,
}

impl MemoryReportAdapter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn reports(&self) -> Vec<SecuritySummaryReport> {
		self.reports.read().clone()
	}
}

#[async_trait]
impl ReportAdapter for MemoryReportAdapter {
	async fn persist_report(&self, report: &SecuritySummaryReport) -> ClResult<()> {
		self.reports.write().push(report.clone());
		Ok(())
	}
}

/// Audit adapter that fails every call, for exercising outage handling
#[derive(Debug, Default)]
pub struct FailingAuditAdapter;

#[async_trait]
impl AuditAdapter for FailingAuditAdapter {
	async fn log_security_event(&self, _alert: SecurityAlert) -> ClResult<()> {
		Err(Error::ServiceUnavailable("audit trail unreachable".into()))
	}

	async fn log_system_event(&self, _kind: &str, _details: Value) -> ClResult<()> {
		Err(Error::ServiceUnavailable("audit trail unreachable".into()))
	}

	async fn log_error(&self, _error: &str, _context: Value) -> ClResult<()> {
		Err(Error::ServiceUnavailable("audit trail unreachable".into()))
	}

	async fn query_activities(
		&self,
		_user_id: &str,
		_opts: ListActivityOptions,
	) -> ClResult<Vec<ActivityRecord>> {
		Err(Error::ServiceUnavailable("audit trail unreachable".into()))
	}

	async fn query_security_alerts(&self, _opts: ListAlertOptions) -> ClResult<Vec<SecurityAlert>> {
		Err(Error::ServiceUnavailable("audit trail unreachable".into()))
	}
}

/// Session adapter that fails every call, for exercising outage handling
#[derive(Debug, Default)]
pub struct FailingSessionAdapter;

#[async_trait]
impl SessionAdapter for FailingSessionAdapter {
	async fn query_active_sessions(&self, _user_id: &str) -> ClResult<Vec<SessionRecord>> {
		Err(Error::ServiceUnavailable("session store unreachable".into()))
	}
}


// vim: ts=4
