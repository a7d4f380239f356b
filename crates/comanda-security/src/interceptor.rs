//! Event Interceptor Chain
//!
//! Explicit middleware composition for the real-time transport: every
//! inbound client event passes through an ordered chain of checks before
//! its handler runs (blocked-address check, rate limit, audit tap). The
//! transport builds the chain once at startup and runs it per event.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use comanda_types::audit_adapter::AuditAdapter;

use crate::error::RateLimitError;
use crate::monitor::SecurityMonitor;
use crate::prelude::*;

/// The origin tuple the transport delivers for every inbound event
#[derive(Debug, Clone)]
pub struct EventContext {
	pub connection_id: Box<str>,
	pub user_id: Option<Box<str>>,
	pub address: Box<str>,
	pub event_name: Box<str>,
}

/// One stage in the event dispatch chain. An `Err` rejects the event
/// before its handler runs.
#[async_trait]
pub trait EventInterceptor: Send + Sync {
	async fn check(&self, ctx: &EventContext) -> Result<(), RateLimitError>;
}

/// Ordered chain of interceptors, run front to back
#[derive(Default)]
pub struct InterceptorChain {
	stages: Vec<Arc<dyn EventInterceptor>>,
}

impl InterceptorChain {
	pub fn new() -> Self {
		Self { stages: Vec::new() }
	}

	/// Append a stage to the chain
	pub fn with(mut self, stage: Arc<dyn EventInterceptor>) -> Self {
		self.stages.push(stage);
		self
	}

	/// Run all stages; the first rejection wins
	pub async fn run(&self, ctx: &EventContext) -> Result<(), RateLimitError> {
		for stage in &self.stages {
			stage.check(ctx).await?;
		}
		Ok(())
	}
}

/// Rejects events from blocked addresses
pub struct BlockedAddressCheck {
	monitor: Arc<SecurityMonitor>,
}

impl BlockedAddressCheck {
	pub fn new(monitor: Arc<SecurityMonitor>) -> Arc<Self> {
		Arc::new(Self { monitor })
	}
}

#[async_trait]
impl EventInterceptor for BlockedAddressCheck {
	async fn check(&self, ctx: &EventContext) -> Result<(), RateLimitError> {
		if self.monitor.is_blocked(&ctx.address) {
			debug!("Rejected event {} from blocked address {}", ctx.event_name, ctx.address);
			return Err(RateLimitError::Blocked);
		}
		Ok(())
	}
}

/// Applies the per-connection event flood limit
pub struct RateLimitCheck {
	monitor: Arc<SecurityMonitor>,
}

impl RateLimitCheck {
	pub fn new(monitor: Arc<SecurityMonitor>) -> Arc<Self> {
		Arc::new(Self { monitor })
	}
}

#[async_trait]
impl EventInterceptor for RateLimitCheck {
	async fn check(&self, ctx: &EventContext) -> Result<(), RateLimitError> {
		let decision =
			self.monitor.check_connection_rate_limit(&ctx.connection_id, &ctx.event_name);
		if decision.allowed {
			Ok(())
		} else {
			Err(RateLimitError::RateLimited {
				scope: "connection",
				retry_after: decision.retry_after.unwrap_or_default(),
			})
		}
	}
}

/// Logs extra detail for events from suspicious addresses. Never rejects.
pub struct AuditTap {
	monitor: Arc<SecurityMonitor>,
	audit: Arc<dyn AuditAdapter>,
}

impl AuditTap {
	pub fn new(monitor: Arc<SecurityMonitor>, audit: Arc<dyn AuditAdapter>) -> Arc<Self> {
		Arc::new(Self { monitor, audit })
	}
}

#[async_trait]
impl EventInterceptor for AuditTap {
	async fn check(&self, ctx: &EventContext) -> Result<(), RateLimitError> {
		if self.monitor.is_suspicious(&ctx.address) {
			let audit = Arc::clone(&self.audit);
			let details = json!({
				"event": ctx.event_name,
				"connectionId": ctx.connection_id,
				"userId": ctx.user_id,
				"address": ctx.address,
			});
			// Best-effort; event dispatch never waits on the audit write
			tokio::spawn(async move {
				if let Err(e) = audit.log_system_event("suspicious_origin_event", details).await {
					warn!("Failed to log suspicious-origin event: {}", e);
				}
			});
		}
		Ok(())
	}
}

// vim: ts=4
