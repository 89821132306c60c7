use std::sync::Arc;

use mnas_core::messages::{Completion, CompletionNotification, ContextRequest};
use mnas_core::{Itti, Mailbox, MessageDef, MessagePayload, TaskId};
use mnas_esm_core::{ContextStore, EsmInformationProc, TimerService};
use mnas_shared::ContextOp;
use tracing::{debug, info, warn};

/// Owner of the session context store (TASK_GUTI_RECEIVER).
///
/// The store never leaves this task while it runs. Other tasks reach it only
/// through GUTI_MSG requests, which are applied one at a time in mailbox order.
pub struct ContextActor<T: TimerService> {
    store: ContextStore,
    mailbox: Mailbox,
    itti: Arc<Itti>,
    timers: T,
    esm_info: Box<dyn EsmInformationProc>,
    relay: TaskId,
}

impl<T: TimerService> ContextActor<T> {
    pub fn new(
        mailbox: Mailbox,
        itti: Arc<Itti>,
        timers: T,
        esm_info: Box<dyn EsmInformationProc>,
        relay: TaskId,
    ) -> Self {
        Self {
            store: ContextStore::new(),
            mailbox,
            itti,
            timers,
            esm_info,
            relay,
        }
    }

    /// Runs until TERMINATE_MESSAGE, then hands the store back with every
    /// timer cancelled.
    pub async fn run(mut self) -> ContextStore {
        let task = self.mailbox.task();
        self.itti.mark_task_ready(task);

        while let Some(msg) = self.mailbox.recv().await {
            let terminate = match &msg.payload {
                MessagePayload::GutiMsg(req) => {
                    self.handle_request(req).await;
                    false
                }
                MessagePayload::Terminate => true,
                _ => {
                    debug!(id = %msg.id(), origin = %msg.origin, "Unknown message ID");
                    false
                }
            };
            self.itti.release(msg);

            if terminate {
                break;
            }
        }

        let stopped = self.store.stop_all_timers(&self.timers);
        info!(task = %task, contexts = self.store.len(), stopped, "Context task terminated");
        self.store
    }

    async fn handle_request(&mut self, req: &ContextRequest) {
        let guti = req.guti;
        let mut completion = self.store.apply(guti, req.op.clone(), &self.timers);
        debug!(%guti, pti = req.pti, op = req.op.name(), ?completion, "Context operation applied");

        mnas_metrics::CONTEXT_OPS_TOTAL
            .with_label_values(&[req.op.name()])
            .inc();
        if completion == Completion::StaleTimer {
            mnas_metrics::STALE_TIMER_EXPIRIES_TOTAL.inc();
        }

        if let (ContextOp::TimerExpired { arg, .. }, Completion::Applied) = (&req.op, &completion) {
            if let Some(follow_up) = self.esm_info.on_t3489_expiry(&guti, arg) {
                completion = self.store.apply(guti, follow_up, &self.timers);
            }
        }
        mnas_metrics::ACTIVE_CONTEXTS.set(self.store.len() as i64);

        let Some(reply_to) = req.reply_to else {
            return;
        };
        let notification = CompletionNotification {
            guti,
            pti: req.pti,
            reply_to,
            completion,
        };
        let msg = MessageDef::new(self.mailbox.task(), MessagePayload::GutiRtn(notification));
        if let Err(e) = self.itti.send_msg_to_task(self.relay, msg).await {
            warn!(%guti, pti = req.pti, error = %e, "Completion not delivered to relay");
        }
    }
}
