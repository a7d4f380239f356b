//! Membership Sets
//!
//! Blocked (hard deny) and suspicious (soft flag) address lists, consulted
//! on every inbound connection and request. A block may carry an optional
//! expiry; expiry is evaluated lazily on lookup.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::prelude::*;

/// Blocked and suspicious address sets
#[derive(Debug)]
pub struct AddressSets {
	/// Address -> optional expiry. `None` means permanent.
	blocked: RwLock<HashMap<Box<str>, Option<Instant>>>,
	suspicious: RwLock<HashSet<Box<str>>>,
	/// Lifetime applied to new blocks; `None` makes blocks permanent
	block_ttl: Option<Duration>,
}

impl AddressSets {
	pub fn new(block_ttl: Option<Duration>) -> Self {
		Self {
			blocked: RwLock::new(HashMap::new()),
			suspicious: RwLock::new(HashSet::new()),
			block_ttl,
		}
	}

	/// Hard-deny check, consulted before accepting any connection or request
	pub fn is_blocked(&self, address: &str) -> bool {
		let mut blocked = self.blocked.write();
		match blocked.get(address) {
			Some(Some(expires_at)) if Instant::now() >= *expires_at => {
				blocked.remove(address);
				false
			}
			Some(_) => true,
			None => false,
		}
	}

	/// Soft-flag check, used to decide whether to log extra detail
	pub fn is_suspicious(&self, address: &str) -> bool {
		self.suspicious.read().contains(address)
	}

	/// Add an address to the blocked set. Idempotent; re-blocking refreshes
	/// the expiry.
	pub fn block(&self, address: &str) {
		let expires_at = self.block_ttl.map(|ttl| Instant::now() + ttl);
		self.blocked.write().insert(address.into(), expires_at);
		info!("Address {} blocked", address);
	}

	/// Add an address to the suspicious set. Idempotent.
	pub fn flag(&self, address: &str) {
		self.suspicious.write().insert(address.into());
		debug!("Address {} flagged as suspicious", address);
	}

	/// Remove an address from the blocked set (manual intervention)
	pub fn unblock(&self, address: &str) {
		self.blocked.write().remove(address);
	}

	/// Remove an address from the suspicious set
	pub fn unflag(&self, address: &str) {
		self.suspicious.write().remove(address);
	}

	/// Number of blocked addresses (including not-yet-pruned expired ones)
	pub fn blocked_len(&self) -> usize {
		self.blocked.read().len()
	}

	pub fn suspicious_len(&self) -> usize {
		self.suspicious.read().len()
	}
}


// vim: ts=4
