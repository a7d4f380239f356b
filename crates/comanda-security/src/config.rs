//! Engine configuration.
//!
//! All thresholds and windows are tunable; the defaults match the
//! platform's production settings.

use serde::Deserialize;

/// Configuration for the security engine
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
	/// Per-(connection, event) window length in seconds
	pub connection_window_secs: u64,
	/// Maximum events per connection window
	pub connection_max_events: u32,

	/// Per-(action, identifier, address) window length in seconds
	pub action_window_secs: u64,
	/// Maximum attempts per action window
	pub action_max_attempts: u32,

	/// Same-kind violations on one connection before a forced disconnect
	pub violation_disconnect_threshold: u32,
	/// Brute-force reports for one address before it is blocked
	pub brute_force_block_threshold: u32,
	/// Invalid-token reports for one user before session revocation
	pub invalid_token_revoke_threshold: u32,

	/// Failed logins in the analysis window before an advisory alert
	pub failed_login_alert_threshold: u32,
	/// Distinct addresses in the analysis window before an advisory alert
	pub suspicious_ip_changes: u32,
	/// Concurrent active sessions per user before an advisory alert
	pub max_concurrent_sessions: usize,
	/// Trailing window for login/session analysis, in seconds
	pub analysis_window_secs: i64,

	/// Interval between reaper sweeps, in seconds
	pub reaper_interval_secs: u64,
	/// Idle window entries older than this are evicted, in seconds
	pub retention_secs: u64,

	/// Optional lifetime for blocked addresses. `None` means a block is
	/// permanent until an explicit unblock.
	pub block_ttl_secs: Option<u64>,

	/// Trailing window for the summary report, in seconds
	pub report_window_secs: i64,

	/// Upper bound on tracked counter keys (LRU-evicted beyond this)
	pub max_tracked_keys: usize,
	/// Buffer size of the enforcement directive channel
	pub directive_buffer: usize,
}

impl Default for SecurityConfig {
	fn default() -> Self {
		Self {
			connection_window_secs: 60,
			connection_max_events: 100,
			action_window_secs: 900,
			action_max_attempts: 5,
			violation_disconnect_threshold: 3,
			brute_force_block_threshold: 5,
			invalid_token_revoke_threshold: 3,
			failed_login_alert_threshold: 3,
			suspicious_ip_changes: 3,
			max_concurrent_sessions: 5,
			analysis_window_secs: 3600,
			reaper_interval_secs: 3600,
			retention_secs: 86400,
			block_ttl_secs: None,
			report_window_secs: 86400,
			max_tracked_keys: 50_000,
			directive_buffer: 128,
		}
	}
}


// vim: ts=4
