//! Engine API types
//!
//! Threat classification, rate-limit decisions, enforcement directives,
//! and statistics shared by the engine's components.

use std::time::Duration;

use comanda_types::types::Severity;

use crate::prelude::*;

/// Classification of a detected misbehavior pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreatCategory {
	/// Repeated failed authentication from one address
	BruteForceAttempt,
	/// Anomalous but not yet denied behavior
	SuspiciousActivity,
	/// A rate-limit denial reported by the transport layer
	RateLimitExceeded,
	/// A request carried an invalid or forged token
	InvalidToken,
	/// Anything the dispatcher has no dedicated branch for
	Other(Box<str>),
}

impl ThreatCategory {
	/// Audit category string for this threat
	pub fn as_str(&self) -> &str {
		match self {
			ThreatCategory::BruteForceAttempt => "brute_force_attempt",
			ThreatCategory::SuspiciousActivity => "suspicious_activity",
			ThreatCategory::RateLimitExceeded => "rate_limit_exceeded",
			ThreatCategory::InvalidToken => "invalid_token",
			ThreatCategory::Other(name) => name,
		}
	}
}

/// A detected threat, consumed by the dispatcher and forwarded to audit.
///
/// Ephemeral: the engine does not retain these after dispatch.
#[derive(Debug, Clone)]
pub struct ThreatEvent {
	pub category: ThreatCategory,
	pub address: Option<Box<str>>,
	pub user_id: Option<Box<str>>,
	pub connection_id: Option<Box<str>>,
	pub timestamp: Timestamp,
}

impl ThreatEvent {
	pub fn new(category: ThreatCategory) -> Self {
		Self {
			category,
			address: None,
			user_id: None,
			connection_id: None,
			timestamp: Timestamp::now(),
		}
	}

	pub fn address(mut self, address: impl Into<Box<str>>) -> Self {
		self.address = Some(address.into());
		self
	}

	pub fn user(mut self, user_id: impl Into<Box<str>>) -> Self {
		self.user_id = Some(user_id.into());
		self
	}

	pub fn connection(mut self, connection_id: impl Into<Box<str>>) -> Self {
		self.connection_id = Some(connection_id.into());
		self
	}
}

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
	/// Whether the action may proceed
	pub allowed: bool,
	/// Attempts remaining in the current window (0 when denied)
	pub remaining: u32,
	/// Time until the window resets (set when denied)
	pub retry_after: Option<Duration>,
}

impl RateDecision {
	/// Severity the transport should log a denial with
	pub fn severity(&self) -> Severity {
		if self.allowed { Severity::Info } else { Severity::Warning }
	}
}

/// Enforcement instruction for the transport / session layers.
///
/// The engine never closes connections or revokes sessions itself; it
/// publishes a directive and the owning layer acts on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineDirective {
	/// Close the connection (repeat policy offender)
	ForceDisconnect { connection_id: Box<str> },
	/// Revoke all of the user's sessions (invalid-token abuse)
	RevokeUserSessions { user_id: Box<str> },
}

/// Snapshot of engine state
#[derive(Debug, Clone, Default)]
pub struct SecurityStats {
	/// Window-counter keys currently tracked
	pub tracked_windows: usize,
	/// Addresses on the blocked list
	pub blocked_addresses: usize,
	/// Addresses on the suspicious list
	pub suspicious_addresses: usize,
	/// Live registered connections
	pub live_connections: usize,
	/// Total rate-limit denials since start
	pub total_denied: u64,
	/// Total enforcement directives published since start
	pub total_escalations: u64,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_category_strings() {
		assert_eq!(ThreatCategory::BruteForceAttempt.as_str(), "brute_force_attempt");
		assert_eq!(ThreatCategory::Other("weird".into()).as_str(), "weird");
	}

	#[test]
	fn test_threat_builder() {
		let event = ThreatEvent::new(ThreatCategory::RateLimitExceeded)
			.connection("conn-1")
			.address("10.0.0.5");
		assert_eq!(event.connection_id.as_deref(), Some("conn-1"));
		assert_eq!(event.address.as_deref(), Some("10.0.0.5"));
		assert!(event.user_id.is_none());
	}
}

// vim: ts=4
