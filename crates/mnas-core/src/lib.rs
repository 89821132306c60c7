// Error types module
pub mod error;

// Intertask messaging substrate
pub mod itti;

// Message catalogue exchanged between tasks
pub mod messages;

// Re-export commonly used types
pub use error::{ErrorSeverity, NasError, Result};
pub use itti::{Itti, IttiBuilder, IttiStats, Mailbox, MessageDef, SendPermit, TaskId};
pub use messages::{MessageId, MessagePayload};
