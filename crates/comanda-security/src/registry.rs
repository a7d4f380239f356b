//! Connection Registry
//!
//! Tracks live real-time connections, their owning user, and a rolling log
//! of policy violations per connection. Closing a connection is the
//! transport's job; the registry only reports when the repeat-offender
//! threshold is crossed.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::prelude::*;

/// One policy violation on a connection
#[derive(Debug, Clone)]
pub struct Violation {
	pub kind: Box<str>,
	pub at: Timestamp,
}

/// A live connection
#[derive(Debug, Clone)]
pub struct ConnectionRecord {
	pub user_id: Option<Box<str>>,
	pub connected_at: Timestamp,
	pub violations: Vec<Violation>,
}

/// Raised when a connection crosses the repeat-offender threshold.
/// Emitted exactly once per (connection, kind).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escalation {
	pub connection_id: Box<str>,
	pub kind: Box<str>,
	pub count: u32,
}

/// Registry of live connections
#[derive(Debug)]
pub struct ConnectionRegistry {
	connections: RwLock<HashMap<Box<str>, ConnectionRecord>>,
	/// Same-kind violations on one connection that trigger an escalation
	threshold: u32,
}

impl ConnectionRegistry {
	pub fn new(threshold: u32) -> Self {
		Self { connections: RwLock::new(HashMap::new()), threshold }
	}

	/// Track a newly opened connection
	pub fn register(&self, connection_id: &str, user_id: Option<&str>) {
		let record = ConnectionRecord {
			user_id: user_id.map(Into::into),
			connected_at: Timestamp::now(),
			violations: Vec::new(),
		};
		self.connections.write().insert(connection_id.into(), record);
		debug!("Connection {} registered (user: {:?})", connection_id, user_id);
	}

	/// Drop a closed connection and its violation log
	pub fn unregister(&self, connection_id: &str) {
		self.connections.write().remove(connection_id);
		debug!("Connection {} unregistered", connection_id);
	}

	/// Record which user authenticated on an already-open connection
	pub fn attach_user(&self, connection_id: &str, user_id: &str) {
		if let Some(record) = self.connections.write().get_mut(connection_id) {
			record.user_id = Some(user_id.into());
		}
	}

	/// Append a violation and evaluate the repeat-offender threshold.
	///
	/// Returns `Some(Escalation)` only when the same-kind count reaches the
	/// threshold exactly, so repeated offenses past it do not re-escalate.
	/// Unknown connections are counted from scratch (the transport may
	/// report violations for connections that raced unregistration).
	pub fn record_violation(&self, connection_id: &str, kind: &str) -> Option<Escalation> {
		let mut connections = self.connections.write();
		let record = connections.entry(connection_id.into()).or_insert_with(|| ConnectionRecord {
			user_id: None,
			connected_at: Timestamp::now(),
			violations: Vec::new(),
		});

		record.violations.push(Violation { kind: kind.into(), at: Timestamp::now() });
		let count =
			u32::try_from(record.violations.iter().filter(|v| v.kind.as_ref() == kind).count())
				.unwrap_or(u32::MAX);

		if count == self.threshold {
			warn!(
				"Connection {} reached {} '{}' violations, escalating",
				connection_id, count, kind
			);
			Some(Escalation { connection_id: connection_id.into(), kind: kind.into(), count })
		} else {
			None
		}
	}

	/// Number of same-kind violations recorded on a connection
	pub fn violation_count(&self, connection_id: &str, kind: &str) -> u32 {
		self.connections.read().get(connection_id).map_or(0, |record| {
			u32::try_from(record.violations.iter().filter(|v| v.kind.as_ref() == kind).count())
				.unwrap_or(u32::MAX)
		})
	}

	/// Owner of a connection, if authenticated
	pub fn user_of(&self, connection_id: &str) -> Option<Box<str>> {
		self.connections.read().get(connection_id).and_then(|record| record.user_id.clone())
	}

	/// Number of live connections
	pub fn len(&self) -> usize {
		self.connections.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.connections.read().is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_register_unregister() {
		let registry = ConnectionRegistry::new(3);
		registry.register("conn-1", Some("alice"));
		assert_eq!(registry.len(), 1);
		assert_eq!(registry.user_of("conn-1").as_deref(), Some("alice"));

		registry.unregister("conn-1");
		assert!(registry.is_empty());
	}

	#[test]
	fn test_escalates_exactly_once() {
		let registry = ConnectionRegistry::new(3);
		registry.register("conn-1", None);

		assert!(registry.record_violation("conn-1", "rate_limit_exceeded").is_none());
		assert!(registry.record_violation("conn-1", "rate_limit_exceeded").is_none());

		let escalation = registry.record_violation("conn-1", "rate_limit_exceeded");
		assert_eq!(
			escalation,
			Some(Escalation {
				connection_id: "conn-1".into(),
				kind: "rate_limit_exceeded".into(),
				count: 3,
			})
		);

		// A 4th violation must not escalate again
		assert!(registry.record_violation("conn-1", "rate_limit_exceeded").is_none());
		assert_eq!(registry.violation_count("conn-1", "rate_limit_exceeded"), 4);
	}

	#[test]
	fn test_kinds_counted_separately() {
		let registry = ConnectionRegistry::new(3);
		registry.register("conn-1", None);

		registry.record_violation("conn-1", "rate_limit_exceeded");
		registry.record_violation("conn-1", "rate_limit_exceeded");
		assert!(registry.record_violation("conn-1", "oversized_payload").is_none());
		assert_eq!(registry.violation_count("conn-1", "rate_limit_exceeded"), 2);
		assert_eq!(registry.violation_count("conn-1", "oversized_payload"), 1);
	}

	#[test]
	fn test_unregister_clears_violations() {
		let registry = ConnectionRegistry::new(3);
		registry.register("conn-1", None);
		registry.record_violation("conn-1", "rate_limit_exceeded");
		registry.unregister("conn-1");
		assert_eq!(registry.violation_count("conn-1", "rate_limit_exceeded"), 0);
	}

	#[test]
	fn test_attach_user() {
		let registry = ConnectionRegistry::new(3);
		registry.register("conn-1", None);
		registry.attach_user("conn-1", "bob");
		assert_eq!(registry.user_of("conn-1").as_deref(), Some("bob"));
	}
}

// vim: ts=4
