//! Automated Response Dispatcher
//!
//! Maps a detected threat category to a remediation action: block the
//! address, flag it, force-disconnect the connection, or invalidate the
//! user's sessions. Every branch writes the raw threat to the audit trail
//! before acting, so the log is complete even if the action fails. Branch
//! failures are caught and logged; they never propagate to the caller.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::RwLock;
use serde_json::json;
use tokio::sync::broadcast;

use comanda_types::audit_adapter::{AuditAdapter, SecurityAlert};
use comanda_types::types::Severity;
use comanda_types::utils::random_id;

use crate::api::{EngineDirective, ThreatCategory, ThreatEvent};
use crate::config::SecurityConfig;
use crate::membership::AddressSets;
use crate::prelude::*;
use crate::registry::ConnectionRegistry;

/// Violation kind recorded against a connection for rate-limit denials
pub const VIOLATION_RATE_LIMIT: &str = "rate_limit_exceeded";

/// Threat-to-action state machine
pub struct ResponseDispatcher {
	audit: Arc<dyn AuditAdapter>,
	addresses: Arc<AddressSets>,
	registry: Arc<ConnectionRegistry>,

	/// Per-address brute-force failure tallies
	brute_force: RwLock<LruCache<Box<str>, u32>>,
	/// Per-user invalid-token tallies
	invalid_tokens: RwLock<LruCache<Box<str>, u32>>,

	/// Enforcement fan-out to the transport / session layers
	directives: broadcast::Sender<EngineDirective>,

	brute_force_threshold: u32,
	invalid_token_threshold: u32,

	total_escalations: AtomicU64,
}

impl ResponseDispatcher {
	pub fn new(
		config: &SecurityConfig,
		audit: Arc<dyn AuditAdapter>,
		addresses: Arc<AddressSets>,
		registry: Arc<ConnectionRegistry>,
	) -> Self {
		// SAFETY: 10_000 is non-zero
		const TEN_THOUSAND: NonZeroUsize = match NonZeroUsize::new(10_000) {
			Some(v) => v,
			None => unreachable!(),
		};
		let tally_cap = NonZeroUsize::new(config.max_tracked_keys / 5).unwrap_or(TEN_THOUSAND);
		let (directives, _) = broadcast::channel(config.directive_buffer.max(1));

		Self {
			audit,
			addresses,
			registry,
			brute_force: RwLock::new(LruCache::new(tally_cap)),
			invalid_tokens: RwLock::new(LruCache::new(tally_cap)),
			directives,
			brute_force_threshold: config.brute_force_block_threshold,
			invalid_token_threshold: config.invalid_token_revoke_threshold,
			total_escalations: AtomicU64::new(0),
		}
	}

	/// Subscribe to enforcement directives (transport and session layers)
	pub fn subscribe(&self) -> broadcast::Receiver<EngineDirective> {
		self.directives.subscribe()
	}

	/// Total enforcement directives published since start
	pub fn escalation_count(&self) -> u64 {
		self.total_escalations.load(Ordering::Relaxed)
	}

	/// Dispatch a threat event. Never fails: collaborator errors are
	/// swallowed after logging so normal traffic is never blocked on the
	/// engine's own bookkeeping.
	pub async fn handle(&self, event: ThreatEvent) {
		// Raw threat goes to the audit trail first
		self.log_threat(&event).await;

		let result = match &event.category {
			ThreatCategory::BruteForceAttempt => self.on_brute_force(&event).await,
			ThreatCategory::SuspiciousActivity => self.on_suspicious(&event).await,
			ThreatCategory::RateLimitExceeded => self.on_rate_limit(&event).await,
			ThreatCategory::InvalidToken => self.on_invalid_token(&event).await,
			ThreatCategory::Other(_) => Ok(()), // Already logged; no state change
		};

		if let Err(e) = result {
			error!("Dispatcher branch failed for {:?}: {}", event.category, e);
			let context = json!({
				"category": event.category.as_str(),
				"address": event.address,
				"userId": event.user_id,
				"connectionId": event.connection_id,
			});
			if let Err(e) = self.audit.log_error(&e.to_string(), context).await {
				warn!("Audit sink unreachable while reporting dispatcher failure: {}", e);
			}
		}
	}

	async fn on_brute_force(&self, event: &ThreatEvent) -> ClResult<()> {
		let Some(address) = event.address.as_deref() else {
			return Err(Error::ValidationError("brute force threat without address".into()));
		};

		let count = {
			let mut tally = self.brute_force.write();
			let count = tally.get_or_insert_mut(address.into(), || 0);
			*count = count.saturating_add(1);
			*count
		};

		if count >= self.brute_force_threshold {
			self.addresses.block(address);
			self.brute_force.write().pop(address);
			self.total_escalations.fetch_add(1, Ordering::Relaxed);
			self.emit_alert(
				"ip_blocked",
				Severity::Critical,
				event,
				json!({ "failures": count }),
			)
			.await;
		}
		Ok(())
	}

	async fn on_suspicious(&self, event: &ThreatEvent) -> ClResult<()> {
		let Some(address) = event.address.as_deref() else {
			return Err(Error::ValidationError("suspicious activity threat without address".into()));
		};

		self.addresses.flag(address);
		self.emit_alert("admin_notification", Severity::Warning, event, json!({})).await;
		Ok(())
	}

	async fn on_rate_limit(&self, event: &ThreatEvent) -> ClResult<()> {
		let Some(connection_id) = event.connection_id.as_deref() else {
			return Err(Error::ValidationError("rate limit threat without connection".into()));
		};

		if let Some(escalation) = self.registry.record_violation(connection_id, VIOLATION_RATE_LIMIT)
		{
			self.total_escalations.fetch_add(1, Ordering::Relaxed);
			self.emit_alert(
				"socket_forced_disconnect",
				Severity::Warning,
				event,
				json!({ "violations": escalation.count }),
			)
			.await;
			let _ignore = self
				.directives
				.send(EngineDirective::ForceDisconnect { connection_id: connection_id.into() });
		}
		Ok(())
	}

	async fn on_invalid_token(&self, event: &ThreatEvent) -> ClResult<()> {
		let Some(user_id) = event.user_id.as_deref() else {
			return Err(Error::ValidationError("invalid token threat without user".into()));
		};

		let count = {
			let mut tally = self.invalid_tokens.write();
			let count = tally.get_or_insert_mut(user_id.into(), || 0);
			*count = count.saturating_add(1);
			*count
		};

		if count >= self.invalid_token_threshold {
			self.invalid_tokens.write().pop(user_id);
			self.total_escalations.fetch_add(1, Ordering::Relaxed);
			self.emit_alert(
				"user_tokens_invalidated",
				Severity::Critical,
				event,
				json!({ "invalidTokens": count }),
			)
			.await;
			let _ignore = self
				.directives
				.send(EngineDirective::RevokeUserSessions { user_id: user_id.into() });
		}
		Ok(())
	}

	/// Clear transient tallies for an address (admin reset)
	pub fn clear_address(&self, address: &str) {
		self.brute_force.write().pop(address);
	}

	/// Clear transient tallies for a user (admin reset)
	pub fn clear_user(&self, user_id: &str) {
		self.invalid_tokens.write().pop(user_id);
	}

	async fn log_threat(&self, event: &ThreatEvent) {
		let alert = SecurityAlert {
			alert_id: random_id().unwrap_or_default(),
			category: event.category.as_str().into(),
			severity: Severity::Info,
			user_id: event.user_id.clone(),
			address: event.address.clone(),
			connection_id: event.connection_id.clone(),
			details: None,
			created_at: event.timestamp,
		};
		if let Err(e) = self.audit.log_security_event(alert).await {
			warn!("Failed to log threat {:?}: {}", event.category, e);
		}
	}

	async fn emit_alert(
		&self,
		category: &str,
		severity: Severity,
		event: &ThreatEvent,
		details: serde_json::Value,
	) {
		let alert = SecurityAlert {
			alert_id: random_id().unwrap_or_default(),
			category: category.into(),
			severity,
			user_id: event.user_id.clone(),
			address: event.address.clone(),
			connection_id: event.connection_id.clone(),
			details: Some(details),
			created_at: Timestamp::now(),
		};
		if let Err(e) = self.audit.log_security_event(alert).await {
			warn!("Failed to log alert {}: {}", category, e);
		}
	}
}


// vim: ts=4
