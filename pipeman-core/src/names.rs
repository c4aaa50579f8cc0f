//! Name synthesis for cluster objects
//!
//! Combined names (`task-batch`, `launch-pipeline`) are cut to
//! [`COMBINED_NAME_MAX`] bytes so a generated suffix still fits under the
//! object-name ceiling. Object names get a random suffix so repeated launches
//! of the same pipeline never collide.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Upper bound for names built by [`combine`]
pub const COMBINED_NAME_MAX: usize = 60;

/// Common ceiling for cluster object names
pub const OBJECT_NAME_MAX: usize = 63;

/// Longest base kept by [`object_name`] before the suffix is appended
const OBJECT_BASE_MAX: usize = 58;

const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const SUFFIX_SEED_LEN: usize = 16;

/// Joins two fragments with `-`, truncated from the right to [`COMBINED_NAME_MAX`]
///
/// # Example
/// ```
/// use pipeman_core::names::combine;
///
/// assert_eq!(combine("test", "linux"), "test-linux");
/// assert_eq!(combine("launch", "deploy"), "launch-deploy");
/// ```
pub fn combine(first: &str, second: &str) -> String {
    truncate(&format!("{}-{}", first, second), COMBINED_NAME_MAX)
}

/// Hard byte-length cut
///
/// Never splits a multi-byte character: the cut moves left to the previous
/// character boundary instead.
pub fn truncate(name: &str, max: usize) -> String {
    if name.len() <= max {
        return name.to_string();
    }

    let mut end = max;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].to_string()
}

/// Builds a unique, cluster-safe object name from a pipeline name
///
/// The name is lower-cased, characters outside `[a-z0-9-]` become `-`, the
/// base is cut to 58 bytes, and a hashed random suffix fills the remainder up
/// to exactly [`OBJECT_NAME_MAX`] characters.
pub fn object_name(name: &str) -> String {
    let mut base = truncate(&sanitize(name), OBJECT_BASE_MAX);
    // A trailing '-' left by the cut would produce "--" before the suffix
    while base.ends_with('-') {
        base.pop();
    }
    if base.is_empty() {
        base.push_str("pipeline");
    }

    let suffix = random_suffix(OBJECT_NAME_MAX - base.len() - 1);
    format!("{}-{}", base, suffix)
}

fn sanitize(name: &str) -> String {
    let lowered: String = name
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();

    lowered.trim_matches('-').to_string()
}

/// Fixed-width lowercase hex string derived from random letters
///
/// The hash only normalizes width; this is not a security token.
fn random_suffix(len: usize) -> String {
    let mut rng = rand::rng();
    let seed: String = (0..SUFFIX_SEED_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();

    let digest = format!("{:x}", Sha256::digest(seed.as_bytes()));
    digest[..len.min(digest.len())].to_string()
}
