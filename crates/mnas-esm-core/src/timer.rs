use mnas_shared::{TimerArg, TimerHandler, TimerId};
use std::time::Duration;

/// Timer collaborator used by the context owner.
///
/// `start` hands back the identifier synchronously; the expiry itself comes
/// back later as a TIMER_HAS_EXPIRED message. `stop` on an unknown or already
/// fired identifier is a no-op.
pub trait TimerService: Send + Sync {
    fn start(&self, duration: Duration, handler: TimerHandler, arg: TimerArg) -> TimerId;

    fn stop(&self, id: TimerId);
}
