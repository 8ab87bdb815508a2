//! Sluice Routing
//!
//! Payment routes over the channel graph and the [`SingleHopRouter`] that
//! executes them as hash-time-locked payments. Only direct (one-hop) routes
//! are executed; the [`Route`] type itself admits longer paths so callers can
//! express them and get a well-defined rejection.

pub mod route;
pub mod router;

pub use route::Route;
pub use router::{PaymentStart, SingleHopRouter};
