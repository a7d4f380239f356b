//! Periodic Reaper
//!
//! Background task that evicts idle window-counter entries past the
//! retention horizon to bound memory. Membership sets and connection
//! records are not reaped: blocks follow their own expiry and closed
//! connections are removed synchronously at disconnect.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::prelude::*;
use crate::window::WindowCounter;

/// Spawn the reaper loop. Stops promptly when `cancel` fires.
pub fn spawn(
	counters: Vec<Arc<WindowCounter>>,
	interval: Duration,
	retention: Duration,
	cancel: CancellationToken,
) -> JoinHandle<()> {
	tokio::spawn(async move {
		loop {
			tokio::select! {
				() = cancel.cancelled() => {
					debug!("Reaper stopped");
					break;
				}
				() = tokio::time::sleep(interval) => {
					sweep(&counters, retention);
				}
			}
		}
	})
}

/// One sweep over all counter stores.
///
/// Keys are snapshotted first and removed individually, so no store is
/// locked for the duration of a full sweep.
pub fn sweep(counters: &[Arc<WindowCounter>], retention: Duration) {
	let mut evicted = 0usize;
	for counter in counters {
		let stale = counter.stale_keys(retention);
		evicted += stale.len();
		for key in stale {
			counter.remove(&key);
		}
	}
	if evicted > 0 {
		info!("Reaper evicted {} idle counter entries", evicted);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_sweep_evicts_only_stale() {
		let counter = Arc::new(WindowCounter::new(1000));
		let window = Duration::from_secs(60);

		counter.check("old", window, 5);
		std::thread::sleep(Duration::from_millis(30));
		counter.check("fresh", window, 5);

		sweep(&[Arc::clone(&counter)], Duration::from_millis(20));
		assert_eq!(counter.len(), 1);
		assert_eq!(counter.peek_count("fresh"), 1);
	}

	#[tokio::test]
	async fn test_reaper_cancellation() {
		let counter = Arc::new(WindowCounter::new(1000));
		let cancel = CancellationToken::new();
		let handle = spawn(
			vec![Arc::clone(&counter)],
			Duration::from_millis(10),
			Duration::from_secs(1),
			cancel.clone(),
		);

		cancel.cancel();
		handle.await.unwrap();
	}

	#[tokio::test]
	async fn test_reaper_evicts_over_time() {
		let counter = Arc::new(WindowCounter::new(1000));
		counter.check("idle", Duration::from_secs(60), 5);

		let cancel = CancellationToken::new();
		let handle = spawn(
			vec![Arc::clone(&counter)],
			Duration::from_millis(20),
			Duration::from_millis(10),
			cancel.clone(),
		);

		tokio::time::sleep(Duration::from_millis(80)).await;
		assert!(counter.is_empty());

		cancel.cancel();
		handle.await.unwrap();
	}
}

// vim: ts=4
