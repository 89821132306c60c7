//! Intertask interface.
//!
//! Every task owns one bounded mailbox. Messages move by value: the sender
//! gives up the payload on `send_msg_to_task`, the receiver owns it until it
//! hands the envelope back through [`Itti::release`].

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, Instrument};

use crate::error::{NasError, Result};
use crate::messages::{MessageId, MessagePayload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskId {
    NasMme,
    GutiReceiver,
    RtnReceiver,
    Timer,
    MmeApp,
    S1ap,
    S6a,
}

impl TaskId {
    pub fn name(self) -> &'static str {
        match self {
            TaskId::NasMme => "TASK_NAS_MME",
            TaskId::GutiReceiver => "TASK_GUTI_RECEIVER",
            TaskId::RtnReceiver => "TASK_RTN_RECEIVER",
            TaskId::Timer => "TASK_TIMER",
            TaskId::MmeApp => "TASK_MME_APP",
            TaskId::S1ap => "TASK_S1AP",
            TaskId::S6a => "TASK_S6A",
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Message envelope
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDef {
    pub origin: TaskId,
    pub payload: MessagePayload,
}

impl MessageDef {
    pub fn new(origin: TaskId, payload: MessagePayload) -> Self {
        Self { origin, payload }
    }

    pub fn id(&self) -> MessageId {
        self.payload.id()
    }
}

#[derive(Debug, Default)]
struct Counters {
    sent: AtomicU64,
    received: AtomicU64,
    released: AtomicU64,
}

/// Snapshot of the substrate counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IttiStats {
    pub sent: u64,
    pub received: u64,
    pub released: u64,
}

impl IttiStats {
    /// Messages received but not yet released.
    pub fn in_flight(&self) -> u64 {
        self.received.saturating_sub(self.released)
    }
}

/// Receiving end of a task's mailbox.
pub struct Mailbox {
    task: TaskId,
    rx: mpsc::Receiver<MessageDef>,
    counters: Arc<Counters>,
}

impl Mailbox {
    pub fn task(&self) -> TaskId {
        self.task
    }

    /// Block until the next message arrives. `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<MessageDef> {
        let msg = self.rx.recv().await?;
        self.counters.received.fetch_add(1, Ordering::Relaxed);
        mnas_metrics::MESSAGES_RECEIVED_TOTAL
            .with_label_values(&[self.task.name()])
            .inc();
        Some(msg)
    }
}

/// Reserved slot in a task's mailbox, from [`Itti::reserve`].
pub struct SendPermit {
    permit: mpsc::OwnedPermit<MessageDef>,
    counters: Arc<Counters>,
}

impl SendPermit {
    pub fn send(self, msg: MessageDef) {
        let _ = self.permit.send(msg);
        self.counters.sent.fetch_add(1, Ordering::Relaxed);
    }
}

pub struct IttiBuilder {
    capacity: usize,
    tasks: Vec<TaskId>,
}

impl IttiBuilder {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tasks: Vec::new(),
        }
    }

    pub fn task(mut self, task: TaskId) -> Self {
        if !self.tasks.contains(&task) {
            self.tasks.push(task);
        }
        self
    }

    pub fn build(self) -> (Arc<Itti>, HashMap<TaskId, Mailbox>) {
        let counters = Arc::new(Counters::default());
        let mut senders = HashMap::new();
        let mut mailboxes = HashMap::new();

        for task in self.tasks {
            let (tx, rx) = mpsc::channel(self.capacity);
            senders.insert(task, tx);
            mailboxes.insert(
                task,
                Mailbox {
                    task,
                    rx,
                    counters: counters.clone(),
                },
            );
        }

        let itti = Arc::new(Itti {
            senders,
            ready: Mutex::new(HashSet::new()),
            ready_notify: Notify::new(),
            counters,
        });
        (itti, mailboxes)
    }
}

pub struct Itti {
    senders: HashMap<TaskId, mpsc::Sender<MessageDef>>,
    ready: Mutex<HashSet<TaskId>>,
    ready_notify: Notify,
    counters: Arc<Counters>,
}

impl Itti {
    /// Spawn the body of a task inside its own tracing span.
    pub fn create_task<F>(&self, task: TaskId, body: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        debug!(task = task.name(), "Creating task");
        tokio::spawn(body.instrument(tracing::info_span!("task", name = task.name())))
    }

    pub fn mark_task_ready(&self, task: TaskId) {
        self.ready.lock().insert(task);
        self.ready_notify.notify_waiters();
        debug!(task = task.name(), "Task ready");
    }

    pub fn is_task_ready(&self, task: TaskId) -> bool {
        self.ready.lock().contains(&task)
    }

    /// Wait until every listed task has called `mark_task_ready`.
    pub async fn wait_tasks_ready(&self, tasks: &[TaskId]) {
        loop {
            let notified = self.ready_notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if tasks.iter().all(|t| self.is_task_ready(*t)) {
                return;
            }
            notified.await;
        }
    }

    pub async fn send_msg_to_task(&self, to: TaskId, msg: MessageDef) -> Result<()> {
        let tx = self.senders.get(&to).ok_or(NasError::UnknownTask(to))?;
        tx.send(msg).await.map_err(|_| NasError::MailboxClosed(to))?;
        self.counters.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Wait for room in the mailbox of `to`. The slot stays held until the
    /// permit is used or dropped, so a task can wait for room inside a
    /// `select!` and keep receiving meanwhile.
    pub async fn reserve(&self, to: TaskId) -> Result<SendPermit> {
        let tx = self.senders.get(&to).ok_or(NasError::UnknownTask(to))?.clone();
        let permit = tx.reserve_owned().await.map_err(|_| NasError::MailboxClosed(to))?;
        Ok(SendPermit {
            permit,
            counters: self.counters.clone(),
        })
    }

    /// Return a handled message to the substrate. Consumes the envelope.
    pub fn release(&self, msg: MessageDef) {
        self.counters.released.fetch_add(1, Ordering::Relaxed);
        mnas_metrics::MESSAGES_RELEASED_TOTAL
            .with_label_values(&[msg.id().name()])
            .inc();
        drop(msg);
    }

    /// Send TERMINATE_MESSAGE to every registered task.
    pub async fn broadcast_terminate(&self, origin: TaskId) {
        for (task, tx) in &self.senders {
            let msg = MessageDef::new(origin, MessagePayload::Terminate);
            if tx.send(msg).await.is_ok() {
                self.counters.sent.fetch_add(1, Ordering::Relaxed);
            } else {
                debug!(task = task.name(), "Task already gone, skipping terminate");
            }
        }
    }

    pub fn tasks(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.senders.keys().copied()
    }

    pub fn stats(&self) -> IttiStats {
        IttiStats {
            sent: self.counters.sent.load(Ordering::Relaxed),
            received: self.counters.received.load(Ordering::Relaxed),
            released: self.counters.released.load(Ordering::Relaxed),
        }
    }
}
