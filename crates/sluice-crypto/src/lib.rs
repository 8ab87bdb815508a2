pub mod hashing;
pub mod secret;

pub use hashing::{hash, hashlock, verify_preimage, Hash};
pub use secret::PaymentSecret;
