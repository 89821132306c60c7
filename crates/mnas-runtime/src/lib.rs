// Owner of the session context store
pub mod context_actor;

// Main NAS dispatch loop
pub mod nas_task;

// Requester-side reply deadlines
pub mod pending;

// Completion to reply relay
pub mod relay_actor;

// DelayQueue backed timer task
pub mod timer_service;

use std::collections::HashMap;
use std::sync::Arc;

use mnas_config::NasConfig;
use mnas_core::{Itti, IttiBuilder, Mailbox, NasError, Result, TaskId};
use mnas_emm_core::EmmSap;
use mnas_esm_core::{ContextStore, EsmInformationProc};
use mnas_shared::ContextInit;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub use context_actor::ContextActor;
pub use nas_task::{LoopState, NasAction, NasProc, NasTask, ProcResult};
pub use pending::PendingReplies;
pub use relay_actor::RelayActor;
pub use timer_service::{NasTimerService, TimerHandle};

/// Tasks started by [`nas_init`].
pub const NAS_TASKS: [TaskId; 3] = [TaskId::NasMme, TaskId::GutiReceiver, TaskId::RtnReceiver];

/// Collaborators handed to the NAS tasks at start-up.
pub struct NasCollaborators<P: NasProc> {
    pub emm_sap: EmmSap,
    pub proc: P,
    pub esm_info: Box<dyn EsmInformationProc>,
}

/// What the tasks hand back once they have terminated.
pub struct NasShutdown<P> {
    pub proc: P,
    pub store: ContextStore,
}

/// Running NAS layer.
pub struct NasRuntime<P: NasProc> {
    itti: Arc<Itti>,
    mailboxes: HashMap<TaskId, Mailbox>,
    context_init: ContextInit,
    nas: JoinHandle<P>,
    context: JoinHandle<ContextStore>,
    relay: JoinHandle<()>,
    timer: JoinHandle<()>,
}

/// Start the NAS tasks and wait until each of them is ready.
///
/// `peers` registers extra mailboxes (MME_APP, S1AP, ...) the NAS layer may
/// talk to. Their receiving ends are kept by the returned runtime.
pub async fn nas_init<P>(
    config: &NasConfig,
    collaborators: NasCollaborators<P>,
    peers: &[TaskId],
) -> Result<NasRuntime<P>>
where
    P: NasProc + 'static,
{
    let builder = NAS_TASKS
        .iter()
        .chain(peers)
        .fold(IttiBuilder::new(config.mailbox_capacity), |b, task| b.task(*task));
    let (itti, mut mailboxes) = builder.build();

    let mut take = |task: TaskId| {
        mailboxes
            .remove(&task)
            .ok_or_else(|| NasError::InternalError(format!("no mailbox for {task}")))
    };
    let nas_mailbox = take(TaskId::NasMme)?;
    let context_mailbox = take(TaskId::GutiReceiver)?;
    let relay_mailbox = take(TaskId::RtnReceiver)?;

    let (timer_service, timers) = NasTimerService::new(itti.clone(), TaskId::NasMme);
    let timer = tokio::spawn(timer_service.run());

    let context = itti.create_task(
        TaskId::GutiReceiver,
        ContextActor::new(
            context_mailbox,
            itti.clone(),
            timers,
            collaborators.esm_info,
            TaskId::RtnReceiver,
        )
        .run(),
    );
    let relay = itti.create_task(
        TaskId::RtnReceiver,
        RelayActor::new(relay_mailbox, itti.clone()).run(),
    );
    let nas = itti.create_task(
        TaskId::NasMme,
        NasTask::new(
            nas_mailbox,
            itti.clone(),
            collaborators.emm_sap,
            collaborators.proc,
            config.reply_timeout(),
        )
        .run(),
    );

    itti.wait_tasks_ready(&NAS_TASKS).await;
    info!(peers = peers.len(), "NAS tasks ready");

    Ok(NasRuntime {
        itti,
        mailboxes,
        context_init: ContextInit { t3489: config.t3489() },
        nas,
        context,
        relay,
        timer,
    })
}

impl<P: NasProc + 'static> NasRuntime<P> {
    pub fn itti(&self) -> &Arc<Itti> {
        &self.itti
    }

    /// Receiving end of a peer task registered through [`nas_init`].
    pub fn take_mailbox(&mut self, task: TaskId) -> Option<Mailbox> {
        self.mailboxes.remove(&task)
    }

    /// Initial settings for a new session context, from configuration.
    pub fn context_init(&self) -> ContextInit {
        self.context_init.clone()
    }

    /// Broadcast TERMINATE_MESSAGE and wait for the NAS tasks to finish.
    pub async fn shutdown(self) -> Result<NasShutdown<P>> {
        self.itti.broadcast_terminate(TaskId::MmeApp).await;

        let proc = self.nas.await.map_err(join_error)?;
        let store = self.context.await.map_err(join_error)?;
        self.relay.await.map_err(join_error)?;
        // The timer task follows the context task, which held its only handle
        self.timer.await.map_err(join_error)?;

        info!(contexts = store.len(), "NAS layer stopped");
        Ok(NasShutdown { proc, store })
    }
}

fn join_error(e: tokio::task::JoinError) -> NasError {
    error!(error = %e, "NAS task failed");
    NasError::InternalError(e.to_string())
}
