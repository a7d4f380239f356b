//! Security Monitor
//!
//! The engine facade: an explicitly constructed, dependency-injected
//! service owning all security state, with a well-defined lifecycle.
//! Construct at startup, inject into the transport and session layers,
//! call `start` to launch background tasks, and `stop` at shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use comanda_types::audit_adapter::AuditAdapter;
use comanda_types::report_adapter::{ReportAdapter, SecuritySummaryReport};
use comanda_types::session_adapter::SessionAdapter;

use crate::analyzer::{LoginAnalyzer, LoginEvaluation, SessionEvaluation};
use crate::api::{EngineDirective, RateDecision, SecurityStats, ThreatCategory, ThreatEvent};
use crate::config::SecurityConfig;
use crate::dispatcher::ResponseDispatcher;
use crate::membership::AddressSets;
use crate::prelude::*;
use crate::registry::ConnectionRegistry;
use crate::reaper;
use crate::report::ReportGenerator;
use crate::window::WindowCounter;

/// Central security service for the platform
pub struct SecurityMonitor {
	config: SecurityConfig,

	/// Per-(connection, event) flood counters
	connection_windows: Arc<WindowCounter>,
	/// Per-(action, identifier, address) attempt counters
	action_windows: Arc<WindowCounter>,

	addresses: Arc<AddressSets>,
	registry: Arc<ConnectionRegistry>,
	dispatcher: Arc<ResponseDispatcher>,
	analyzer: LoginAnalyzer,
	reporter: ReportGenerator,

	cancel: CancellationToken,
	reaper_handle: Mutex<Option<JoinHandle<()>>>,
	total_denied: AtomicU64,
}

impl SecurityMonitor {
	/// Build the monitor with its collaborators. No background tasks run
	/// until `start` is called.
	pub fn new(
		config: SecurityConfig,
		audit: Arc<dyn AuditAdapter>,
		sessions: Arc<dyn SessionAdapter>,
		reports: Arc<dyn ReportAdapter>,
	) -> Arc<Self> {
		let addresses =
			Arc::new(AddressSets::new(config.block_ttl_secs.map(Duration::from_secs)));
		let registry = Arc::new(ConnectionRegistry::new(config.violation_disconnect_threshold));
		let dispatcher = Arc::new(ResponseDispatcher::new(
			&config,
			Arc::clone(&audit),
			Arc::clone(&addresses),
			Arc::clone(&registry),
		));
		let analyzer = LoginAnalyzer::new(&config, Arc::clone(&audit), sessions);
		let reporter = ReportGenerator::new(&config, Arc::clone(&audit), reports);

		Arc::new(Self {
			connection_windows: Arc::new(WindowCounter::new(config.max_tracked_keys)),
			action_windows: Arc::new(WindowCounter::new(config.max_tracked_keys)),
			addresses,
			registry,
			dispatcher,
			analyzer,
			reporter,
			cancel: CancellationToken::new(),
			reaper_handle: Mutex::new(None),
			total_denied: AtomicU64::new(0),
			config,
		})
	}

	/// Launch background tasks (the reaper). Idempotent.
	pub fn start(&self) {
		let mut handle = self.reaper_handle.lock();
		if handle.is_some() {
			return;
		}
		*handle = Some(reaper::spawn(
			vec![Arc::clone(&self.connection_windows), Arc::clone(&self.action_windows)],
			Duration::from_secs(self.config.reaper_interval_secs),
			Duration::from_secs(self.config.retention_secs),
			self.cancel.clone(),
		));
		info!("Security monitor started");
	}

	/// Stop background tasks. Safe to call more than once.
	pub async fn stop(&self) {
		self.cancel.cancel();
		let handle = self.reaper_handle.lock().take();
		if let Some(handle) = handle {
			if let Err(e) = handle.await {
				warn!("Reaper task ended abnormally: {}", e);
			}
		}
		info!("Security monitor stopped");
	}

	// ===== Membership =====

	/// Checked before accepting any connection or request
	pub fn is_blocked(&self, address: &str) -> bool {
		self.addresses.is_blocked(address)
	}

	/// Checked to decide whether to log extra detail
	pub fn is_suspicious(&self, address: &str) -> bool {
		self.addresses.is_suspicious(address)
	}

	/// Manually lift a block and clear the address's transient tallies
	pub fn unblock(&self, address: &str) {
		self.addresses.unblock(address);
		self.dispatcher.clear_address(address);
	}

	/// Admin reset: clear all transient state for an address
	pub fn reset_address(&self, address: &str) {
		self.addresses.unblock(address);
		self.addresses.unflag(address);
		self.dispatcher.clear_address(address);
	}

	// ===== Rate limits =====

	/// Per-inbound-event flood check. A denial reports a
	/// `RateLimitExceeded` threat; the third denial on one connection
	/// escalates to a forced disconnect.
	pub fn check_connection_rate_limit(
		&self,
		connection_id: &str,
		event_name: &str,
	) -> RateDecision {
		let key = format!("{}:{}", connection_id, event_name);
		let decision = self.connection_windows.check(
			&key,
			Duration::from_secs(self.config.connection_window_secs),
			self.config.connection_max_events,
		);

		if !decision.allowed {
			self.total_denied.fetch_add(1, Ordering::Relaxed);
			self.report_threat(
				ThreatEvent::new(ThreatCategory::RateLimitExceeded).connection(connection_id),
			);
		}
		decision
	}

	/// Pre-authentication attempt check (long window, low ceiling).
	/// The denial itself is the enforcement; callers surface it as a
	/// structured rejection.
	pub fn check_action_rate_limit(
		&self,
		action: &str,
		identifier: &str,
		address: &str,
	) -> RateDecision {
		let key = format!("{}:{}:{}", action, identifier, address);
		let decision = self.action_windows.check(
			&key,
			Duration::from_secs(self.config.action_window_secs),
			self.config.action_max_attempts,
		);
		if !decision.allowed {
			self.total_denied.fetch_add(1, Ordering::Relaxed);
		}
		decision
	}

	// ===== Threats =====

	/// Report a threat for automated response. Fire-and-forget: the caller
	/// never waits on dispatch or audit writes.
	pub fn report_threat(&self, event: ThreatEvent) {
		let dispatcher = Arc::clone(&self.dispatcher);
		tokio::spawn(async move {
			dispatcher.handle(event).await;
		});
	}

	/// As `report_threat`, but awaits dispatch. Used where the caller
	/// needs the response applied before proceeding (tests, admin tools).
	pub async fn report_threat_sync(&self, event: ThreatEvent) {
		self.dispatcher.handle(event).await;
	}

	/// Subscribe to enforcement directives (forced disconnects, session
	/// revocations)
	pub fn subscribe_directives(&self) -> broadcast::Receiver<EngineDirective> {
		self.dispatcher.subscribe()
	}

	// ===== Connection lifecycle =====

	pub fn connection_opened(&self, connection_id: &str, user_id: Option<&str>) {
		self.registry.register(connection_id, user_id);
	}

	pub fn connection_authenticated(&self, connection_id: &str, user_id: &str) {
		self.registry.attach_user(connection_id, user_id);
	}

	pub fn connection_closed(&self, connection_id: &str) {
		self.registry.unregister(connection_id);
		// Counters keyed on the connection are dead weight once it closes
		self.connection_windows.remove_prefix(&format!("{}:", connection_id));
	}

	// ===== Analysis =====

	pub async fn evaluate_login(
		&self,
		user_id: &str,
		success: bool,
		address: &str,
		device: Option<&str>,
	) -> ClResult<LoginEvaluation> {
		self.analyzer.evaluate_login(user_id, success, address, device).await
	}

	pub async fn evaluate_session_activity(
		&self,
		user_id: &str,
		session_id: &str,
		address: &str,
		device: Option<&str>,
	) -> ClResult<SessionEvaluation> {
		self.analyzer.evaluate_session_activity(user_id, session_id, address, device).await
	}

	// ===== Reporting =====

	pub async fn generate_daily_report(&self) -> ClResult<SecuritySummaryReport> {
		self.reporter.generate_daily_report().await
	}

	// ===== Introspection =====

	pub fn stats(&self) -> SecurityStats {
		SecurityStats {
			tracked_windows: self.connection_windows.len() + self.action_windows.len(),
			blocked_addresses: self.addresses.blocked_len(),
			suspicious_addresses: self.addresses.suspicious_len(),
			live_connections: self.registry.len(),
			total_denied: self.total_denied.load(Ordering::Relaxed),
			total_escalations: self.dispatcher.escalation_count(),
		}
	}
}

// vim: ts=4
