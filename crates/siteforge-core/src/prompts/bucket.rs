//! Deterministic bucketing for A/B variant selection
//!
//! This is a load-balancing hash, not a security mechanism: FNV-1a is fast,
//! stable across platforms and releases, and spreads short strings well
//! enough for percentage buckets. It must never be used where an adversary
//! choosing the seed matters.

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over the UTF-8 bytes of `input`
#[must_use]
pub fn bucket_hash(input: &str) -> u32 {
    input.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Bucket in `[0, 100)` for a `(seed, prompt id, version)` triple
#[must_use]
pub fn bucket_for(seed: &str, prompt_id: &str, version: u32) -> u32 {
    bucket_hash(&format!("{seed}{prompt_id}{version}")) % 100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_reference_vectors() {
        assert_eq!(bucket_hash(""), 0x811c_9dc5);
        assert_eq!(bucket_hash("a"), 0xe40c_292c);
        assert_eq!(bucket_hash("foobar"), 0xbf9c_f968);
    }

    #[test]
    fn test_bucket_range_and_stability() {
        for seed in ["org-1", "org-42", "", "ünïcødé"] {
            let b = bucket_for(seed, "site_copy", 3);
            assert!(b < 100);
            assert_eq!(b, bucket_for(seed, "site_copy", 3));
        }
    }
}
