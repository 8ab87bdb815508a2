use sluice_core::PaymentHash;

/// BLAKE3 hash (32 bytes).
pub type Hash = [u8; 32];

/// Hash arbitrary data using BLAKE3.
pub fn hash(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Commitment to a payment secret.
pub fn hashlock(secret: &[u8]) -> PaymentHash {
    PaymentHash(hash(secret))
}

/// Check that `preimage` opens `hashlock`.
///
/// Digest equality is exact on all 32 bytes and constant-time.
pub fn verify_preimage(hashlock: &PaymentHash, preimage: &[u8]) -> bool {
    blake3::Hash::from(*hashlock.as_bytes()) == blake3::hash(preimage)
}
