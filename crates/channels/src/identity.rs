//! Identity derivation for content-addressed channel ids.
//!
//! A channel's id is its content hash, made safe for the directory's id
//! charset.  When an unrelated channel already owns that id, the resolver
//! walks `base`, `base-1`, `base-2`, ... until it converges or finds a
//! free slot.

use sha2::{Digest, Sha256};

/// Longest base id we produce.  Leaves room for a `-NNNN` suffix under
/// the directory's 48-byte group id limit.
pub const MAX_BASE_ID_LEN: usize = 40;

/// The directory truncates group names beyond this many characters.
pub const GROUP_NAME_CHARS: usize = 15;

/// Hex characters kept from the SHA-256 digest.
const CONTENT_HASH_HEX_LEN: usize = 32;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("content hash is empty after removing characters the directory does not accept")]
    Empty,
}

/// Hash a canonical media reference (URL, file path) into a content hash.
pub fn compute_content_hash(reference: &str) -> String {
    let digest = Sha256::digest(reference.trim().as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(CONTENT_HASH_HEX_LEN);
    hex
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

/// The base candidate id for a content hash.
pub fn derive_base_id(content_hash: &str) -> Result<String, IdentityError> {
    let mut id: String = content_hash.chars().filter(|c| is_id_char(*c)).collect();
    // Only ASCII survives the filter, so byte truncation is char-safe.
    id.truncate(MAX_BASE_ID_LEN);
    if id.is_empty() {
        return Err(IdentityError::Empty);
    }
    Ok(id)
}

/// `base_id` for suffix 0, `"{base_id}-{suffix}"` otherwise.
pub fn derive_candidate_id(base_id: &str, suffix: u32) -> String {
    if suffix == 0 {
        base_id.to_owned()
    } else {
        format!("{base_id}-{suffix}")
    }
}

/// Short group name stored in the directory's name slot.
pub fn directory_group_name(display_name: &str) -> String {
    display_name.chars().take(GROUP_NAME_CHARS).collect()
}
