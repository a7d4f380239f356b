//! Window Counter
//!
//! Fixed-window counters keyed by arbitrary strings. Every rate-limited
//! feature (per-connection event flooding, per-action authentication
//! attempts) goes through one of these stores. A full window reset is used
//! rather than a leaky-bucket scheme: simpler, and burst smoothing is not
//! needed at these ceilings.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::RwLock;

use crate::api::RateDecision;
use crate::prelude::*;

/// One counter window for a key
#[derive(Debug, Clone)]
struct WindowEntry {
	count: u32,
	window_start: Instant,
	/// Last time the key was checked; drives reaper eviction
	last_seen: Instant,
}

/// Keyed fixed-window counter store, LRU-bounded.
///
/// The reset-then-increment step runs under a single write lock, so two
/// concurrent callers can never both observe an expired window and double
/// reset it.
pub struct WindowCounter {
	entries: RwLock<LruCache<Box<str>, WindowEntry>>,
}

impl WindowCounter {
	/// Create a store tracking at most `max_keys` keys
	pub fn new(max_keys: usize) -> Self {
		// SAFETY: 50_000 is non-zero
		const FIFTY_THOUSAND: NonZeroUsize = match NonZeroUsize::new(50_000) {
			Some(v) => v,
			None => unreachable!(),
		};
		let cap = NonZeroUsize::new(max_keys).unwrap_or(FIFTY_THOUSAND);
		Self { entries: RwLock::new(LruCache::new(cap)) }
	}

	/// Count one occurrence of `key` and decide whether it is allowed.
	///
	/// The entry is created on first occurrence; an expired window resets
	/// atomically (count to 0, start to now) before the increment.
	pub fn check(&self, key: &str, window: Duration, max: u32) -> RateDecision {
		let now = Instant::now();
		let mut entries = self.entries.write();

		let entry = entries.get_or_insert_mut(Box::from(key), || WindowEntry {
			count: 0,
			window_start: now,
			last_seen: now,
		});

		if now.duration_since(entry.window_start) > window {
			entry.count = 0;
			entry.window_start = now;
		}
		entry.count = entry.count.saturating_add(1);
		entry.last_seen = now;

		if entry.count > max {
			let retry_after = window.saturating_sub(now.duration_since(entry.window_start));
			debug!("Rate limit exceeded for key {} ({}/{})", key, entry.count, max);
			RateDecision { allowed: false, remaining: 0, retry_after: Some(retry_after) }
		} else {
			RateDecision { allowed: true, remaining: max - entry.count, retry_after: None }
		}
	}

	/// Current count for a key, without touching the window
	pub fn peek_count(&self, key: &str) -> u32 {
		self.entries.read().peek(key).map_or(0, |entry| entry.count)
	}

	/// Number of tracked keys
	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	/// Snapshot the keys idle for longer than `retention`.
	///
	/// Read-only; the caller removes keys individually afterwards so the
	/// store is never locked for a full sweep.
	pub fn stale_keys(&self, retention: Duration) -> Vec<Box<str>> {
		let now = Instant::now();
		self.entries
			.read()
			.iter()
			.filter(|(_, entry)| now.duration_since(entry.last_seen) > retention)
			.map(|(key, _)| key.clone())
			.collect()
	}

	/// Remove a single key (no-op if absent)
	pub fn remove(&self, key: &str) {
		self.entries.write().pop(key);
	}

	/// Drop all entries for keys starting with `prefix` (admin reset)
	pub fn remove_prefix(&self, prefix: &str) {
		let keys: Vec<Box<str>> = self
			.entries
			.read()
			.iter()
			.filter(|(key, _)| key.starts_with(prefix))
			.map(|(key, _)| key.clone())
			.collect();
		let mut entries = self.entries.write();
		for key in keys {
			entries.pop(&key);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;

	#[test]
	fn test_allows_up_to_max() {
		let counter = WindowCounter::new(1000);
		let window = Duration::from_secs(60);

		for i in 0..5 {
			let decision = counter.check("key", window, 5);
			assert!(decision.allowed, "call {} should be allowed", i + 1);
			assert_eq!(decision.remaining, 4 - i);
			assert!(decision.retry_after.is_none());
		}

		let decision = counter.check("key", window, 5);
		assert!(!decision.allowed);
		assert_eq!(decision.remaining, 0);
		assert!(decision.retry_after.unwrap() > Duration::ZERO);
	}

	#[test]
	fn test_window_reset() {
		let counter = WindowCounter::new(1000);
		let window = Duration::from_millis(50);

		for _ in 0..3 {
			counter.check("key", window, 2);
		}
		assert!(!counter.check("key", window, 2).allowed);

		std::thread::sleep(Duration::from_millis(80));

		let decision = counter.check("key", window, 2);
		assert!(decision.allowed);
		assert_eq!(decision.remaining, 1);
	}

	#[test]
	fn test_independent_keys() {
		let counter = WindowCounter::new(1000);
		let window = Duration::from_secs(60);

		for _ in 0..3 {
			counter.check("a", window, 2);
		}
		assert!(!counter.check("a", window, 2).allowed);
		assert!(counter.check("b", window, 2).allowed);
	}

	#[test]
	fn test_concurrent_no_lost_updates() {
		let counter = Arc::new(WindowCounter::new(1000));
		let window = Duration::from_secs(600);
		let threads: u32 = 8;
		let per_thread: u32 = 250;

		let handles: Vec<_> = (0..threads)
			.map(|_| {
				let counter = Arc::clone(&counter);
				std::thread::spawn(move || {
					for _ in 0..per_thread {
						counter.check("shared", window, u32::MAX);
					}
				})
			})
			.collect();
		for handle in handles {
			handle.join().unwrap();
		}

		assert_eq!(counter.peek_count("shared"), threads * per_thread);
	}

	#[test]
	fn test_stale_key_snapshot() {
		let counter = WindowCounter::new(1000);
		let window = Duration::from_secs(60);

		counter.check("old", window, 5);
		std::thread::sleep(Duration::from_millis(30));
		counter.check("fresh", window, 5);

		let stale = counter.stale_keys(Duration::from_millis(20));
		assert_eq!(stale, vec![Box::from("old")]);

		counter.remove("old");
		assert_eq!(counter.len(), 1);
	}

	#[test]
	fn test_remove_prefix() {
		let counter = WindowCounter::new(1000);
		let window = Duration::from_secs(60);

		counter.check("login:alice:10.0.0.1", window, 5);
		counter.check("login:alice:10.0.0.2", window, 5);
		counter.check("login:bob:10.0.0.1", window, 5);

		counter.remove_prefix("login:alice:");
		assert_eq!(counter.len(), 1);
		assert_eq!(counter.peek_count("login:bob:10.0.0.1"), 1);
	}
}

// vim: ts=4
