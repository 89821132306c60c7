use mnas_shared::{ContextOp, Guti, TimerArg};
use tracing::{info, warn};

/// Reaction of the ESM information procedure to a verified T3489 expiry.
///
/// Runs on the context owner task; the returned operation, if any, is applied
/// to the same context before the next message is taken.
pub trait EsmInformationProc: Send {
    fn on_t3489_expiry(&mut self, guti: &Guti, arg: &TimerArg) -> Option<ContextOp>;
}

/// Re-arm T3489 until the retransmission budget is spent (TS 24.301 6.6.1.2.6).
#[derive(Debug, Clone)]
pub struct T3489Retransmission {
    pub max_retransmissions: u8,
}

impl Default for T3489Retransmission {
    fn default() -> Self {
        Self { max_retransmissions: 5 }
    }
}

impl EsmInformationProc for T3489Retransmission {
    fn on_t3489_expiry(&mut self, guti: &Guti, arg: &TimerArg) -> Option<ContextOp> {
        let count = arg.count.saturating_add(1);
        if count > self.max_retransmissions {
            warn!(%guti, ue_id = arg.ue_id, count, "T3489 expired too often, aborting ESM information procedure");
            return None;
        }
        info!(%guti, ue_id = arg.ue_id, count, "T3489 expired, retransmitting ESM information request");
        Some(ContextOp::StartTimer {
            duration: None,
            arg: TimerArg { count, ..arg.clone() },
        })
    }
}
