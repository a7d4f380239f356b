//! Small shared utilities.

use base64::Engine;
use rand::Rng;

use crate::prelude::*;

/// Generate a random, URL-safe identifier (16 bytes of entropy)
pub fn random_id() -> ClResult<Box<str>> {
	let mut bytes = [0u8; 16];
	rand::rng().fill_bytes(&mut bytes);
	Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes).into())
}


// vim: ts=4
