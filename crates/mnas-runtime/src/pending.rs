use std::collections::HashMap;
use std::time::Duration;

use futures::stream::StreamExt;
use mnas_core::messages::ContextReply;
use mnas_core::{NasError, Result};
use mnas_shared::{Guti, ProcTid};
use tokio_util::time::{delay_queue::Key, DelayQueue};

/// Requests sent to the context owner that still wait for their reply.
///
/// Keyed by (GUTI, PTI). Each entry ends exactly once: either a matching
/// reply resolves it or its deadline fires through [`PendingReplies::next_timeout`].
pub struct PendingReplies {
    timeout: Duration,
    entries: HashMap<(Guti, ProcTid), Key>,
    queue: DelayQueue<(Guti, ProcTid)>,
}

impl PendingReplies {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            entries: HashMap::new(),
            queue: DelayQueue::new(),
        }
    }

    pub fn register(&mut self, guti: Guti, pti: ProcTid) -> Result<()> {
        if self.entries.contains_key(&(guti, pti)) {
            return Err(NasError::InternalError(format!(
                "transaction pti={pti} of {guti} already pending"
            )));
        }
        let key = self.queue.insert((guti, pti), self.timeout);
        self.entries.insert((guti, pti), key);
        Ok(())
    }

    /// Forget a request whose message never left.
    pub fn cancel(&mut self, guti: Guti, pti: ProcTid) {
        if let Some(key) = self.entries.remove(&(guti, pti)) {
            self.queue.remove(&key);
        }
    }

    /// `true` when the reply belongs to a pending request.
    pub fn resolve(&mut self, reply: &ContextReply) -> bool {
        match self.entries.remove(&(reply.guti, reply.pti)) {
            Some(key) => {
                self.queue.remove(&key);
                true
            }
            None => false,
        }
    }

    /// Next request whose deadline passed. Pending forever while nothing is armed.
    pub async fn next_timeout(&mut self) -> (Guti, ProcTid) {
        loop {
            if self.queue.is_empty() {
                std::future::pending::<()>().await;
            }
            if let Some(expired) = self.queue.next().await {
                let key = expired.into_inner();
                self.entries.remove(&key);
                return key;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
