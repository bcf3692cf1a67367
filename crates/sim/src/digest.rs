//! State digest hashing.
//!
//! FNV-1a 64-bit over little-endian bytes, with floats canonicalized so that
//! two runs fed the same inputs hash identically.

/// Digest algorithm identifier recorded alongside attempt artifacts.
pub const STATE_DIGEST_ALGO_ID: &str = "splitself-digest-v1-fnv1a64-le-f64canon";

/// FNV-1a 64-bit offset basis.
const FNV1A_OFFSET_BASIS: u64 = 0xcbf29ce484222325;

/// FNV-1a 64-bit prime.
const FNV1A_PRIME: u64 = 0x100000001b3;

#[derive(Debug, Clone)]
pub(crate) struct Fnv1a64 {
    state: u64,
}

impl Fnv1a64 {
    pub(crate) fn new() -> Self {
        Self {
            state: FNV1A_OFFSET_BASIS,
        }
    }

    pub(crate) fn update(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= u64::from(byte);
            self.state = self.state.wrapping_mul(FNV1A_PRIME);
        }
    }

    pub(crate) fn write_u64(&mut self, value: u64) {
        self.update(&value.to_le_bytes());
    }

    pub(crate) fn write_f64(&mut self, value: f64) {
        self.update(&canonicalize_f64(value).to_le_bytes());
    }

    pub(crate) fn write_vec2(&mut self, value: [f64; 2]) {
        self.write_f64(value[0]);
        self.write_f64(value[1]);
    }

    pub(crate) fn finish(self) -> u64 {
        self.state
    }
}

/// Canonicalize an f64 value for hashing.
///
/// - `-0.0` → `+0.0`
/// - Any NaN → quiet NaN bit pattern `0x7ff8000000000000`
pub(crate) fn canonicalize_f64(value: f64) -> u64 {
    const QUIET_NAN_BITS: u64 = 0x7ff8000000000000;

    if value.is_nan() {
        QUIET_NAN_BITS
    } else if value == 0.0 {
        0u64
    } else {
        value.to_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f64_canonicalization() {
        assert_eq!(canonicalize_f64(-0.0), canonicalize_f64(0.0));
        assert_eq!(canonicalize_f64(-0.0), 0u64);

        let nan1 = f64::NAN;
        let nan2 = f64::from_bits(0x7ff0000000000001);
        assert_eq!(canonicalize_f64(nan1), canonicalize_f64(nan2));
        assert_eq!(canonicalize_f64(nan1), 0x7ff8000000000000);

        assert_eq!(canonicalize_f64(1.0), 1.0f64.to_bits());
        assert_eq!(canonicalize_f64(-1.0), (-1.0f64).to_bits());
    }

    #[test]
    fn test_fnv_known_vector() {
        // FNV-1a 64 of "a"
        let mut hasher = Fnv1a64::new();
        hasher.update(b"a");
        assert_eq!(hasher.finish(), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn test_signed_zero_hashes_equal() {
        let mut a = Fnv1a64::new();
        a.write_vec2([0.0, -0.0]);
        let mut b = Fnv1a64::new();
        b.write_vec2([-0.0, 0.0]);
        assert_eq!(a.finish(), b.finish());
    }
}
