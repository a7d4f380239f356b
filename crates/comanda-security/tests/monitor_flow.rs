//! End-to-end engine flows against the in-memory adapters.

use std::sync::Arc;
use std::time::Duration;

use comanda_audit_adapter_memory::{MemoryAuditAdapter, MemoryReportAdapter, MemorySessionAdapter};
use comanda_security::interceptor::{
	BlockedAddressCheck, EventContext, InterceptorChain, RateLimitCheck,
};
use comanda_security::{
	EngineDirective, RateLimitError, SecurityConfig, SecurityMonitor, ThreatCategory, ThreatEvent,
};

struct Harness {
	monitor: Arc<SecurityMonitor>,
	audit: Arc<MemoryAuditAdapter>,
}

fn harness(config: SecurityConfig) -> Harness {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
	let audit = Arc::new(MemoryAuditAdapter::new());
	let monitor = SecurityMonitor::new(
		config,
		Arc::clone(&audit) as Arc<dyn comanda_types::audit_adapter::AuditAdapter>,
		Arc::new(MemorySessionAdapter::new()),
		Arc::new(MemoryReportAdapter::new()),
	);
	Harness { monitor, audit }
}

#[tokio::test]
async fn test_login_attempt_budget() {
	let h = harness(SecurityConfig::default());

	// Five attempts fit the window, counting down the budget
	for expected_remaining in (0..5).rev() {
		let decision = h.monitor.check_action_rate_limit("login", "user_42", "10.0.0.5");
		assert!(decision.allowed);
		assert_eq!(decision.remaining, expected_remaining);
	}

	// The sixth is denied with the window's remaining lifetime
	let decision = h.monitor.check_action_rate_limit("login", "user_42", "10.0.0.5");
	assert!(!decision.allowed);
	assert_eq!(decision.remaining, 0);
	let retry = decision.retry_after.unwrap();
	assert!(retry <= Duration::from_secs(900));
	assert!(retry > Duration::from_secs(890));

	// A different address for the same user has its own budget
	let decision = h.monitor.check_action_rate_limit("login", "user_42", "10.0.0.6");
	assert!(decision.allowed);
}

#[tokio::test]
async fn test_connection_flood_escalates_to_disconnect() {
	let h = harness(SecurityConfig::default());
	let mut directives = h.monitor.subscribe_directives();

	for _ in 0..100 {
		assert!(h.monitor.check_connection_rate_limit("conn-1", "order:update").allowed);
	}

	// Denials report threats; the third violation forces a disconnect
	for _ in 0..3 {
		assert!(!h.monitor.check_connection_rate_limit("conn-1", "order:update").allowed);
	}

	let directive = tokio::time::timeout(Duration::from_secs(1), directives.recv())
		.await
		.expect("directive not published")
		.unwrap();
	assert_eq!(directive, EngineDirective::ForceDisconnect { connection_id: "conn-1".into() });

	assert_eq!(h.monitor.stats().total_denied, 3);
}

#[tokio::test]
async fn test_brute_force_blocks_address() {
	let h = harness(SecurityConfig::default());

	for _ in 0..5 {
		h.monitor
			.report_threat_sync(
				ThreatEvent::new(ThreatCategory::BruteForceAttempt).address("203.0.113.9"),
			)
			.await;
	}

	assert!(h.monitor.is_blocked("203.0.113.9"));
	assert_eq!(h.audit.alerts_of("ip_blocked").len(), 1);

	h.monitor.unblock("203.0.113.9");
	assert!(!h.monitor.is_blocked("203.0.113.9"));

	// Tallies were cleared with the block: one new failure does not re-block
	h.monitor
		.report_threat_sync(
			ThreatEvent::new(ThreatCategory::BruteForceAttempt).address("203.0.113.9"),
		)
		.await;
	assert!(!h.monitor.is_blocked("203.0.113.9"));
}

#[tokio::test]
async fn test_invalid_tokens_revoke_sessions() {
	let h = harness(SecurityConfig::default());
	let mut directives = h.monitor.subscribe_directives();

	for _ in 0..3 {
		h.monitor
			.report_threat_sync(ThreatEvent::new(ThreatCategory::InvalidToken).user("user_7"))
			.await;
	}

	let directive = directives.try_recv().unwrap();
	assert_eq!(directive, EngineDirective::RevokeUserSessions { user_id: "user_7".into() });
}

#[tokio::test]
async fn test_connection_lifecycle_clears_counters() {
	let h = harness(SecurityConfig::default());

	h.monitor.connection_opened("conn-9", None);
	h.monitor.connection_authenticated("conn-9", "user_1");
	h.monitor.check_connection_rate_limit("conn-9", "ping");
	h.monitor.check_connection_rate_limit("conn-9", "order:update");
	assert_eq!(h.monitor.stats().live_connections, 1);
	assert_eq!(h.monitor.stats().tracked_windows, 2);

	h.monitor.connection_closed("conn-9");
	assert_eq!(h.monitor.stats().live_connections, 0);
	assert_eq!(h.monitor.stats().tracked_windows, 0);
}

#[tokio::test]
async fn test_start_stop_lifecycle() {
	let h = harness(SecurityConfig::default());
	h.monitor.start();
	h.monitor.start(); // Idempotent
	h.monitor.stop().await;
	h.monitor.stop().await; // Safe to repeat
}

#[tokio::test]
async fn test_interceptor_chain_rejects_in_order() {
	let h = harness(SecurityConfig::default());
	let chain = InterceptorChain::new()
		.with(BlockedAddressCheck::new(Arc::clone(&h.monitor)))
		.with(RateLimitCheck::new(Arc::clone(&h.monitor)));

	let ctx = EventContext {
		connection_id: "conn-2".into(),
		user_id: None,
		address: "198.51.100.4".into(),
		event_name: "table:join".into(),
	};

	assert!(chain.run(&ctx).await.is_ok());

	// Block the address; the chain now rejects before the rate limit runs
	for _ in 0..5 {
		h.monitor
			.report_threat_sync(
				ThreatEvent::new(ThreatCategory::BruteForceAttempt).address("198.51.100.4"),
			)
			.await;
	}
	assert!(matches!(chain.run(&ctx).await, Err(RateLimitError::Blocked)));
}

#[tokio::test]
async fn test_evaluation_and_report_flow() {
	let h = harness(SecurityConfig::default());

	// Failed logins are evaluated, never denied here
	for _ in 0..3 {
		let eval = h.monitor.evaluate_login("user_3", false, "10.0.0.8", None).await.unwrap();
		assert!(eval.analysis.failed_attempts >= 1);
	}

	let report = h.monitor.generate_daily_report().await.unwrap();
	assert_eq!(report.total_alerts, h.audit.alerts().len() as u64);
}

// vim: ts=4
