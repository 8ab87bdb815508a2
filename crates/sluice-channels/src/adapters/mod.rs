pub mod clock;
pub mod internal;
pub mod registry;

pub use clock::{ManualClock, SystemClock};
pub use internal::{InternalTransfer, TransferRecord};
pub use registry::{InMemoryRegistry, Participant};
