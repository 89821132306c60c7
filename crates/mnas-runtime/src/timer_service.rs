use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::StreamExt;
use mnas_core::messages::TimerExpiry;
use mnas_core::{Itti, MessageDef, MessagePayload, TaskId};
use mnas_esm_core::TimerService;
use mnas_shared::{TimerArg, TimerHandler, TimerId};
use tokio::sync::mpsc;
use tokio_util::time::{delay_queue::Key, DelayQueue};
use tracing::{debug, warn};

enum TimerCommand {
    Start {
        id: TimerId,
        duration: Duration,
        handler: TimerHandler,
        arg: TimerArg,
    },
    Stop(TimerId),
}

/// Cloneable handle to the timer task. Identifiers are allocated here so that
/// `start` can return them without waiting for the timer task.
#[derive(Clone)]
pub struct TimerHandle {
    next_id: Arc<AtomicU64>,
    tx: mpsc::UnboundedSender<TimerCommand>,
}

impl TimerService for TimerHandle {
    fn start(&self, duration: Duration, handler: TimerHandler, arg: TimerArg) -> TimerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        if self
            .tx
            .send(TimerCommand::Start { id, duration, handler, arg })
            .is_err()
        {
            warn!(timer_id = id, "Timer task is gone, timer will never fire");
        }
        id
    }

    fn stop(&self, id: TimerId) {
        let _ = self.tx.send(TimerCommand::Stop(id));
    }
}

struct Armed {
    key: Key,
    handler: TimerHandler,
    arg: TimerArg,
}

/// Timer task. Expiries are delivered as TIMER_HAS_EXPIRED to `target`.
///
/// Runs until every [`TimerHandle`] is dropped.
pub struct NasTimerService {
    itti: Arc<Itti>,
    target: TaskId,
    rx: mpsc::UnboundedReceiver<TimerCommand>,
    queue: DelayQueue<TimerId>,
    armed: HashMap<TimerId, Armed>,
}

impl NasTimerService {
    pub fn new(itti: Arc<Itti>, target: TaskId) -> (Self, TimerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let service = Self {
            itti,
            target,
            rx,
            queue: DelayQueue::new(),
            armed: HashMap::new(),
        };
        let handle = TimerHandle {
            next_id: Arc::new(AtomicU64::new(0)),
            tx,
        };
        (service, handle)
    }

    pub async fn run(mut self) {
        loop {
            tokio::select! {
                cmd = self.rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },

                Some(expired) = self.queue.next(), if !self.queue.is_empty() => {
                    self.fire(expired.into_inner()).await;
                }
            }
        }

        let left = self.armed.len();
        mnas_metrics::ARMED_TIMERS.sub(left as i64);
        debug!(left, "Timer task stopped");
    }

    fn handle_command(&mut self, cmd: TimerCommand) {
        match cmd {
            TimerCommand::Start { id, duration, handler, arg } => {
                let key = self.queue.insert(id, duration);
                self.armed.insert(id, Armed { key, handler, arg });
                mnas_metrics::ARMED_TIMERS.inc();
                debug!(timer_id = id, ?duration, ?handler, "Timer started");
            }
            TimerCommand::Stop(id) => match self.armed.remove(&id) {
                Some(armed) => {
                    self.queue.remove(&armed.key);
                    mnas_metrics::ARMED_TIMERS.dec();
                    debug!(timer_id = id, "Timer stopped");
                }
                None => debug!(timer_id = id, "Stop for inactive timer ignored"),
            },
        }
    }

    async fn fire(&mut self, id: TimerId) {
        let Some(armed) = self.armed.remove(&id) else {
            return;
        };
        mnas_metrics::ARMED_TIMERS.dec();

        let msg = MessageDef::new(
            TaskId::Timer,
            MessagePayload::TimerHasExpired(TimerExpiry {
                timer_id: id,
                handler: armed.handler,
                arg: armed.arg,
            }),
        );
        if let Err(e) = self.itti.send_msg_to_task(self.target, msg).await {
            warn!(timer_id = id, error = %e, "Failed to deliver timer expiry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnas_core::IttiBuilder;
    use mnas_shared::Guti;

    fn arg() -> TimerArg {
        TimerArg { guti: Guti::default(), ue_id: 1, ebi: 5, count: 0 }
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_is_delivered() {
        let (itti, mut mailboxes) = IttiBuilder::new(8).task(TaskId::NasMme).build();
        let mut mailbox = mailboxes.remove(&TaskId::NasMme).unwrap();
        let (service, timers) = NasTimerService::new(itti.clone(), TaskId::NasMme);
        tokio::spawn(service.run());

        let id = timers.start(Duration::from_secs(4), TimerHandler::EsmInformationT3489, arg());

        let msg = mailbox.recv().await.unwrap();
        assert_eq!(msg.origin, TaskId::Timer);
        match &msg.payload {
            MessagePayload::TimerHasExpired(expiry) => {
                assert_eq!(expiry.timer_id, id);
                assert_eq!(expiry.handler, TimerHandler::EsmInformationT3489);
                assert_eq!(expiry.arg, arg());
            }
            other => panic!("Unexpected message: {:?}", other.id()),
        }
        itti.release(msg);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_timer_never_fires() {
        let (itti, mut mailboxes) = IttiBuilder::new(8).task(TaskId::NasMme).build();
        let mut mailbox = mailboxes.remove(&TaskId::NasMme).unwrap();
        let (service, timers) = NasTimerService::new(itti.clone(), TaskId::NasMme);
        tokio::spawn(service.run());

        let first = timers.start(Duration::from_secs(1), TimerHandler::Procedure(1), arg());
        let second = timers.start(Duration::from_secs(2), TimerHandler::Procedure(2), arg());
        timers.stop(first);
        // Unknown and repeated stops are harmless
        timers.stop(first);
        timers.stop(999);

        let msg = mailbox.recv().await.unwrap();
        match &msg.payload {
            MessagePayload::TimerHasExpired(expiry) => assert_eq!(expiry.timer_id, second),
            other => panic!("Unexpected message: {:?}", other.id()),
        }
        itti.release(msg);

        let next = tokio::time::timeout(Duration::from_secs(10), mailbox.recv()).await;
        assert!(next.is_err());
    }

    #[tokio::test]
    async fn test_service_stops_with_handles() {
        let (itti, _mailboxes) = IttiBuilder::new(8).task(TaskId::NasMme).build();
        let (service, timers) = NasTimerService::new(itti, TaskId::NasMme);
        let task = tokio::spawn(service.run());
        drop(timers);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
