//! Adapter that persists generated security summary reports.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::collections::HashMap;
use std::fmt::Debug;

use crate::prelude::*;
use crate::types::serialize_timestamp_iso;

/// A single recommendation derived from alert history
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
	/// "high" | "medium" | "low"
	pub priority: Box<str>,
	pub message: Box<str>,
}

/// Aggregate report over the audit trail's alert history.
///
/// Immutable once written; the engine hands it to the report adapter and
/// does not retain a copy.
#[skip_serializing_none]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySummaryReport {
	pub report_id: Box<str>,
	#[serde(serialize_with = "serialize_timestamp_iso")]
	pub generated_at: Timestamp,
	#[serde(serialize_with = "serialize_timestamp_iso")]
	pub window_start: Timestamp,
	#[serde(serialize_with = "serialize_timestamp_iso")]
	pub window_end: Timestamp,
	pub total_alerts: u64,
	pub counts_by_category: HashMap<Box<str>, u64>,
	pub counts_by_user: HashMap<Box<str>, u64>,
	pub counts_by_address: HashMap<Box<str>, u64>,
	pub recommendations: Vec<Recommendation>,
}

#[async_trait]
pub trait ReportAdapter: Send + Sync + Debug {
	/// Persist a generated report as a new record
	async fn persist_report(&self, report: &SecuritySummaryReport) -> ClResult<()>;
}


// vim: ts=4
