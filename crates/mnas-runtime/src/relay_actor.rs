use std::sync::Arc;

use mnas_core::messages::{CompletionNotification, ContextReply};
use mnas_core::{Itti, Mailbox, MessageDef, MessagePayload};
use mnas_esm_core::relay;
use tracing::{debug, info, warn};

/// Result relay (TASK_RTN_RECEIVER).
///
/// Turns each completion into a CONTEXT_RTN addressed to the mailbox named in
/// the original request, so the requester always hears back.
pub struct RelayActor {
    mailbox: Mailbox,
    itti: Arc<Itti>,
}

impl RelayActor {
    pub fn new(mailbox: Mailbox, itti: Arc<Itti>) -> Self {
        Self { mailbox, itti }
    }

    pub async fn run(mut self) {
        let task = self.mailbox.task();
        self.itti.mark_task_ready(task);

        while let Some(msg) = self.mailbox.recv().await {
            let terminate = match &msg.payload {
                MessagePayload::GutiRtn(notification) => {
                    self.relay(notification).await;
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
        info!(task = %task, "Relay task terminated");
    }

    async fn relay(&self, notification: &CompletionNotification) {
        let result = relay::to_result(notification.completion.clone());
        debug!(
            guti = %notification.guti,
            pti = notification.pti,
            to = %notification.reply_to,
            ?result,
            "Relaying context result"
        );

        let reply = ContextReply {
            guti: notification.guti,
            pti: notification.pti,
            result,
        };
        let msg = MessageDef::new(self.mailbox.task(), MessagePayload::ContextRtn(reply));
        if let Err(e) = self.itti.send_msg_to_task(notification.reply_to, msg).await {
            // The requester's deadline covers this case
            warn!(pti = notification.pti, error = %e, "Reply not delivered");
        }
    }
}
