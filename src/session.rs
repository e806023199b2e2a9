//! Generates the opaque session identifiers used for the chart and quote
//! sessions multiplexed onto one transport.

use rand::Rng;

const SUFFIX_LEN: usize = 12;

/// Produces `<prefix><12 lowercase letters>` drawn from a cryptographically
/// strong RNG. Collision probability per pair of ids is at most 26⁻¹².
pub fn new_session(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| rng.gen_range(b'a'..=b'z') as char)
        .collect();
    format!("{prefix}{suffix}")
}
