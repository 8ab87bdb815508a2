pub mod admin;
pub mod channel;
pub mod htlc;
pub mod pay;
pub mod status;
