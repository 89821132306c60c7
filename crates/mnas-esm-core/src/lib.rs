// Session context data
pub mod context;

// Context store and mutation protocol
pub mod store;

// Timer collaborator seam
pub mod timer;

// Outcome computation for the result relay
pub mod relay;

// T3489 expiry policy
pub mod expiry;

pub use context::{EsmContext, NasTimer};
pub use expiry::{EsmInformationProc, T3489Retransmission};
pub use store::ContextStore;
pub use timer::TimerService;
