//! Stable hashing helpers.
//!
//! Hashes produced here are persisted in plan fingerprints and asserted on in
//! tests, so they must be identical across platforms, processes and compiler
//! versions. Nothing in this module may depend on `std::hash::Hash` or on
//! addresses.

use xxhash_rust::xxh3::Xxh3;

const SEGMENT_TAG: u8 = 0xA5;

///
/// StableHasher
///
/// Incremental xxh3-64 hasher with length-prefixed segment framing, so that
/// `["ab", "c"]` and `["a", "bc"]` never collide by construction.
///

pub struct StableHasher {
    inner: Xxh3,
}

impl StableHasher {
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Xxh3::new() }
    }

    /// Write one framed byte segment.
    pub fn write_segment(&mut self, bytes: &[u8]) {
        let len = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        self.inner.update(&[SEGMENT_TAG]);
        self.inner.update(&len.to_le_bytes());
        self.inner.update(bytes);
    }

    /// Write one framed string segment.
    pub fn write_str(&mut self, s: &str) {
        self.write_segment(s.as_bytes());
    }

    pub fn write_bool(&mut self, flag: bool) {
        self.inner.update(&[u8::from(flag)]);
    }

    #[must_use]
    pub fn finish(&self) -> u64 {
        self.inner.digest()
    }
}

impl Default for StableHasher {
    fn default() -> Self {
        Self::new()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing_separates_segment_boundaries() {
        let mut left = StableHasher::new();
        left.write_str("ab");
        left.write_str("c");

        let mut right = StableHasher::new();
        right.write_str("a");
        right.write_str("bc");

        assert_ne!(left.finish(), right.finish());
    }

    #[test]
    fn repeated_hashing_is_deterministic() {
        let hash = |parts: &[&str]| {
            let mut hasher = StableHasher::new();
            for part in parts {
                hasher.write_str(part);
                hasher.write_bool(false);
            }
            hasher.finish()
        };

        assert_eq!(hash(&["a", "b"]), hash(&["a", "b"]));
        assert_ne!(hash(&["a", "b"]), hash(&["b", "a"]));
    }

    #[test]
    fn digests_are_pinned() {
        // xxh3-64 with the default seed.
        assert_eq!(StableHasher::new().finish(), 0x2d06_8005_38d3_94c2);

        let mut hasher = StableHasher::new();
        hasher.write_str("a");
        hasher.write_bool(false);
        assert_eq!(hasher.finish(), 0x9b8b_1931_394f_fde5);
    }
}
