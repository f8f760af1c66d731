use cryptoxide::digest::Digest;
use cryptoxide::sha2::Sha256;

/// `sha256(sha256(data))`, the protocol's native object hash.
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let mut first = [0u8; 32];
    let mut hasher = Sha256::new();
    hasher.input(data);
    hasher.result(&mut first);

    let mut second = [0u8; 32];
    let mut hasher = Sha256::new();
    hasher.input(&first);
    hasher.result(&mut second);

    second
}

/// The double-SHA256 of `data` plus the frame checksum derived from it: its
/// first four bytes read as a little-endian integer.
pub fn checksum(data: &[u8]) -> ([u8; 32], u32) {
    let hash = double_sha256(data);
    let sum = u32::from_le_bytes([hash[0], hash[1], hash[2], hash[3]]);
    (hash, sum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_known_answer() {
        let (hash, sum) = checksum(b"");
        assert_eq!(
            hex::encode(hash),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
        assert_eq!(sum, 0xE2E0_F65D);
    }

    #[test]
    fn checksum_is_the_hash_prefix() {
        let (hash, sum) = checksum(b"hello");
        assert_eq!(sum.to_le_bytes(), hash[..4]);
        assert_eq!(sum, 0xDFC9_9595);
    }
}
