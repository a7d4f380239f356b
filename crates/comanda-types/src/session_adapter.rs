//! Adapter that exposes the platform's session store to the security engine.
//!
//! Read-only: the engine counts and inspects sessions, it never creates or
//! revokes them directly. Revocation is requested through an enforcement
//! directive handled by the session layer itself.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fmt::Debug;

use crate::prelude::*;

/// A session as seen by the security engine
#[skip_serializing_none]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
	pub session_id: Box<str>,

	/// Staff account owning the session
	pub user_id: Box<str>,

	/// Network origin the session was opened from
	pub address: Option<Box<str>>,

	/// Client device fingerprint
	pub device: Option<Box<str>>,

	pub created_at: Timestamp,

	pub expires_at: Option<Timestamp>,

	/// Whether the session has been revoked
	pub revoked: bool,
}

impl SessionRecord {
	/// Whether the session is usable right now (not revoked, not expired)
	pub fn is_active(&self) -> bool {
		!self.revoked && self.expires_at.is_none_or(|exp| Timestamp::now() < exp)
	}
}

#[async_trait]
pub trait SessionAdapter: Send + Sync + Debug {
	/// List a user's currently active (non-revoked, non-expired) sessions
	async fn query_active_sessions(&self, user_id: &str) -> ClResult<Vec<SessionRecord>>;
}


// vim: ts=4
