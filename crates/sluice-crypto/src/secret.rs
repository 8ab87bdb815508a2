use rand::RngCore;
use sluice_core::{PaymentHash, Preimage};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::hashing::hashlock;

/// A payment secret held by the party that will later reveal it.
///
/// Wiped from memory on drop; only its hashlock should ever leave the
/// holder before fulfillment.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PaymentSecret {
    bytes: [u8; 32],
}

impl PaymentSecret {
    /// Generate a fresh random secret.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    pub fn hashlock(&self) -> PaymentHash {
        hashlock(&self.bytes)
    }

    /// Copy the secret out for revealing it on fulfillment.
    pub fn to_preimage(&self) -> Preimage {
        Preimage(self.bytes.to_vec())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl std::fmt::Debug for PaymentSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentSecret(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::verify_preimage;

    #[test]
    fn test_generate_unique() {
        let a = PaymentSecret::generate();
        let b = PaymentSecret::generate();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_preimage_opens_hashlock() {
        let secret = PaymentSecret::generate();
        let lock = secret.hashlock();
        assert!(verify_preimage(&lock, secret.to_preimage().as_bytes()));
    }

    #[test]
    fn test_debug_redacts() {
        let secret = PaymentSecret::from_bytes([7u8; 32]);
        let shown = format!("{:?}", secret);
        assert!(!shown.contains("07"));
    }

    #[test]
    fn test_hex_length() {
        assert_eq!(PaymentSecret::from_bytes([0u8; 32]).to_hex().len(), 64);
    }
}
