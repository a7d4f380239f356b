//! Adapter that persists and queries the platform's audit trail.
//!
//! The security engine writes alerts and system events through this adapter
//! and reads authentication history back for anomaly analysis. Writes are
//! best-effort from the engine's point of view: a failing sink must never
//! stall a rate-limit decision.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use std::fmt::Debug;

use crate::prelude::*;
use crate::types::{Severity, serialize_timestamp_iso};

/// A persisted security alert record
#[skip_serializing_none]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityAlert {
	/// Content id of the alert record
	pub alert_id: Box<str>,

	/// Alert category (e.g., "excessive_failed_logins", "ip_blocked")
	pub category: Box<str>,

	pub severity: Severity,

	/// Staff account the alert concerns, if any
	pub user_id: Option<Box<str>>,

	/// Network origin the alert concerns, if any
	pub address: Option<Box<str>>,

	/// Real-time connection the alert concerns, if any
	pub connection_id: Option<Box<str>>,

	/// Category-specific payload
	pub details: Option<Value>,

	#[serde(serialize_with = "serialize_timestamp_iso")]
	pub created_at: Timestamp,
}

/// A persisted activity record (logins, session heartbeats, domain events)
#[skip_serializing_none]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
	pub activity_id: Box<str>,

	/// Staff account that performed the activity
	pub user_id: Box<str>,

	/// Activity kind (e.g., "login_success", "login_failed", "session_activity")
	pub kind: Box<str>,

	/// Network origin of the activity
	pub address: Option<Box<str>>,

	/// Client device fingerprint
	pub device: Option<Box<str>>,

	/// Session the activity belongs to, if any
	pub session_id: Option<Box<str>>,

	pub created_at: Timestamp,
}

/// Filter options for activity queries
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListActivityOptions {
	/// Restrict to these activity kinds
	pub kinds: Option<Vec<Box<str>>>,
	/// Only activities at or after this time
	pub since: Option<Timestamp>,
}

/// Filter options for security alert queries
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListAlertOptions {
	/// Only alerts at or after this time
	pub since: Option<Timestamp>,
	/// Restrict to these severities
	pub severities: Option<Vec<Severity>>,
}

#[async_trait]
pub trait AuditAdapter: Send + Sync + Debug {
	/// Append a security alert to the audit trail
	async fn log_security_event(&self, alert: SecurityAlert) -> ClResult<()>;

	/// Append a system event (lifecycle, maintenance) to the audit trail
	async fn log_system_event(&self, kind: &str, details: Value) -> ClResult<()>;

	/// Record an internal error with its originating context
	async fn log_error(&self, error: &str, context: Value) -> ClResult<()>;

	/// Query a user's activity history, newest first
	async fn query_activities(
		&self,
		user_id: &str,
		opts: ListActivityOptions,
	) -> ClResult<Vec<ActivityRecord>>;

	/// Query security alerts, newest first
	async fn query_security_alerts(&self, opts: ListAlertOptions) -> ClResult<Vec<SecurityAlert>>;
}


// vim: ts=4
