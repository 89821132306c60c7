use std::collections::VecDeque;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use mnas_core::messages::{
    AuthInfoAns, ContextReply, ContextRequest, CreateDedicatedBearerReq, EstablishRej,
    PdnConfigRsp, PdnConnectivityFail, PdnConnectivityRsp, TimerExpiry,
};
use mnas_core::{ErrorSeverity, Itti, Mailbox, MessageDef, MessagePayload, NasError, Result, TaskId};
use mnas_emm_core::EmmSap;
use mnas_shared::{ContextOp, ContextResult, EmmSapMessage, Guti, MmeUeS1apId, ProcTid, TimerHandler};
use tracing::{debug, error, info, warn};

use crate::pending::PendingReplies;

/// Follow-up requested by a procedure handler.
#[derive(Debug, Clone, PartialEq)]
pub enum NasAction {
    /// Mutate a session context. With `await_reply` the result comes back
    /// through [`NasProc::context_reply`], or as `TimedOut` after the deadline.
    Context {
        guti: Guti,
        pti: ProcTid,
        op: ContextOp,
        await_reply: bool,
    },
    /// Hand a primitive to the EMM Service Access Point.
    EmmSap(EmmSapMessage),
}

pub type ProcResult = Result<Vec<NasAction>>;

/// NAS procedure layer invoked by the dispatch loop.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NasProc: Send {
    async fn emm_attach_reject(&mut self, rej: &EstablishRej) -> ProcResult;

    async fn create_dedicated_bearer(&mut self, req: &CreateDedicatedBearerReq) -> ProcResult;

    async fn dl_transfer_cnf(&mut self, ue_id: MmeUeS1apId, err_code: u32, nas_msg: &Bytes) -> ProcResult;

    async fn dl_transfer_rej(&mut self, ue_id: MmeUeS1apId, err_code: u32, nas_msg: &Bytes) -> ProcResult;

    async fn pdn_config_res(&mut self, rsp: &PdnConfigRsp) -> ProcResult;

    async fn pdn_connectivity_fail(&mut self, fail: &PdnConnectivityFail) -> ProcResult;

    async fn pdn_connectivity_res(&mut self, rsp: &PdnConnectivityRsp) -> ProcResult;

    async fn implicit_detach_ue_ind(&mut self, ue_id: MmeUeS1apId) -> ProcResult;

    async fn deregister_ue(&mut self, ue_id: MmeUeS1apId) -> ProcResult;

    async fn authentication_info_answer(&mut self, ans: &AuthInfoAns) -> ProcResult;

    /// Expiry of a timer owned by the procedure layer.
    async fn timer_expired(&mut self, expiry: &TimerExpiry) -> ProcResult;

    /// Reply, or timeout, of a context request sent with `await_reply`.
    async fn context_reply(&mut self, reply: &ContextReply) -> ProcResult;

    /// Release network resources on termination.
    async fn cleanup(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Ready,
    Processing,
    Terminated,
}

/// Main NAS task (TASK_NAS_MME).
///
/// Takes one message at a time from its mailbox, dispatches it on the exact
/// message id and releases it afterwards, whatever the handler returned.
///
/// Requests for the context owner wait in an outbox and leave only when its
/// mailbox has room. Replies come back into this task's own mailbox, so the
/// loop never blocks on a send while its mailbox is left unread.
pub struct NasTask<P: NasProc> {
    mailbox: Mailbox,
    itti: Arc<Itti>,
    emm_sap: EmmSap,
    proc: P,
    pending: PendingReplies,
    outbox: VecDeque<ContextRequest>,
    context_task: TaskId,
    state: LoopState,
}

impl<P: NasProc> NasTask<P> {
    pub fn new(
        mailbox: Mailbox,
        itti: Arc<Itti>,
        emm_sap: EmmSap,
        proc: P,
        reply_timeout: Duration,
    ) -> Self {
        Self {
            mailbox,
            itti,
            emm_sap,
            proc,
            pending: PendingReplies::new(reply_timeout),
            outbox: VecDeque::new(),
            context_task: TaskId::GutiReceiver,
            state: LoopState::Ready,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Runs until TERMINATE_MESSAGE and gives the procedure layer back.
    pub async fn run(mut self) -> P {
        self.emm_sap.initialize();
        self.itti.mark_task_ready(self.mailbox.task());

        while self.state != LoopState::Terminated {
            self.state = LoopState::Ready;

            tokio::select! {
                received = self.mailbox.recv() => {
                    let Some(msg) = received else {
                        warn!("Mailbox closed without TERMINATE_MESSAGE");
                        self.nas_exit().await;
                        break;
                    };

                    self.state = LoopState::Processing;
                    let flow = self.dispatch(&msg).await;
                    self.itti.release(msg);

                    if flow.is_break() {
                        self.state = LoopState::Terminated;
                        info!("TASK_NAS_MME terminated");
                    }
                }

                (guti, pti) = self.pending.next_timeout() => {
                    self.state = LoopState::Processing;
                    mnas_metrics::REPLY_TIMEOUTS_TOTAL.inc();
                    warn!(error = %NasError::ReplyTimeout { guti, pti }, "Context request timed out");

                    let reply = ContextReply { guti, pti, result: ContextResult::TimedOut };
                    let result = self.proc.context_reply(&reply).await;
                    self.complete("context_reply", result).await;
                }

                permit = self.itti.reserve(self.context_task), if !self.outbox.is_empty() => {
                    let Some(req) = self.outbox.pop_front() else {
                        continue;
                    };
                    match permit {
                        Ok(permit) => {
                            let msg = MessageDef::new(self.mailbox.task(), MessagePayload::GutiMsg(req));
                            permit.send(msg);
                        }
                        Err(e) => {
                            error!(guti = %req.guti, pti = req.pti, error = %e, "Context request not delivered");
                            if req.reply_to == Some(self.mailbox.task()) {
                                self.pending.cancel(req.guti, req.pti);
                            }
                        }
                    }
                }
            }
        }

        self.state = LoopState::Terminated;
        self.proc
    }

    async fn dispatch(&mut self, msg: &MessageDef) -> ControlFlow<()> {
        match &msg.payload {
            MessagePayload::EmmSap(primitive) => {
                if let Err(e) = self.emm_sap.send(primitive.clone()) {
                    log_failure("emm_sap_send", &e);
                }
            }
            MessagePayload::EmmReg(primitive) => {
                if let Err(e) = self.emm_sap.reg_send(primitive.clone()) {
                    log_failure("emm_reg_send", &e);
                }
            }
            MessagePayload::NasEmmAsEstablishRej(rej) => {
                let result = self.proc.emm_attach_reject(rej).await;
                self.complete("emm_attach_reject", result).await;
            }
            MessagePayload::MessageTest => {
                info!("TASK_NAS_MME received MESSAGE_TEST");
            }
            MessagePayload::CreateDedicatedBearerReq(req) => {
                let result = self.proc.create_dedicated_bearer(req).await;
                self.complete("create_dedicated_bearer", result).await;
            }
            MessagePayload::NasDownlinkDataCnf(cnf) => {
                let result = self.proc.dl_transfer_cnf(cnf.ue_id, cnf.err_code, &cnf.nas_msg).await;
                self.complete("dl_transfer_cnf", result).await;
            }
            MessagePayload::NasDownlinkDataRej(rej) => {
                let result = self.proc.dl_transfer_rej(rej.ue_id, rej.err_code, &rej.nas_msg).await;
                self.complete("dl_transfer_rej", result).await;
            }
            MessagePayload::NasPdnConfigRsp(rsp) => {
                let result = self.proc.pdn_config_res(rsp).await;
                self.complete("pdn_config_res", result).await;
            }
            MessagePayload::NasPdnConnectivityFail(fail) => {
                let result = self.proc.pdn_connectivity_fail(fail).await;
                self.complete("pdn_connectivity_fail", result).await;
            }
            MessagePayload::NasPdnConnectivityRsp(rsp) => {
                let result = self.proc.pdn_connectivity_res(rsp).await;
                self.complete("pdn_connectivity_res", result).await;
            }
            MessagePayload::NasImplicitDetachUeInd { ue_id } => {
                let result = self.proc.implicit_detach_ue_ind(*ue_id).await;
                self.complete("implicit_detach_ue_ind", result).await;
            }
            MessagePayload::S1apDeregisterUeReq { mme_ue_s1ap_id } => {
                let result = self.proc.deregister_ue(*mme_ue_s1ap_id).await;
                self.complete("deregister_ue", result).await;
            }
            MessagePayload::S6aAuthInfoAns(ans) => {
                let result = self.proc.authentication_info_answer(ans).await;
                self.complete("authentication_info_answer", result).await;
            }
            MessagePayload::TimerHasExpired(expiry) => {
                self.timer_expired(expiry).await;
            }
            MessagePayload::GutiMsg(req) => {
                // Context requests belong to the context owner
                self.forward_external(req.clone());
            }
            MessagePayload::ContextRtn(reply) => {
                if self.pending.resolve(reply) {
                    let result = self.proc.context_reply(reply).await;
                    self.complete("context_reply", result).await;
                } else {
                    debug!(guti = %reply.guti, pti = reply.pti, "Reply without pending request dropped");
                }
            }
            MessagePayload::Terminate => {
                self.nas_exit().await;
                return ControlFlow::Break(());
            }
            MessagePayload::GutiRtn(_) | MessagePayload::Foreign { .. } => {
                debug!(id = %msg.id(), origin = %msg.origin, "Unknown message ID");
            }
        }
        ControlFlow::Continue(())
    }

    async fn timer_expired(&mut self, expiry: &TimerExpiry) {
        match expiry.handler {
            TimerHandler::EsmInformationT3489 => {
                // The context owner checks the id against the armed timer
                let req = ContextRequest {
                    guti: expiry.arg.guti,
                    pti: 0,
                    op: ContextOp::TimerExpired {
                        timer_id: expiry.timer_id,
                        arg: expiry.arg.clone(),
                    },
                    reply_to: None,
                };
                self.enqueue(req);
            }
            TimerHandler::Procedure(_) => {
                let result = self.proc.timer_expired(expiry).await;
                self.complete("timer_expired", result).await;
            }
        }
    }

    async fn complete(&mut self, handler: &'static str, result: ProcResult) {
        match result {
            Ok(actions) => self.execute(actions).await,
            Err(e) => log_failure(handler, &e),
        }
    }

    async fn execute(&mut self, actions: Vec<NasAction>) {
        for action in actions {
            match action {
                NasAction::Context { guti, pti, op, await_reply } => {
                    let reply_to = if await_reply {
                        if let Err(e) = self.pending.register(guti, pti) {
                            log_failure("context_request", &e);
                            continue;
                        }
                        Some(self.mailbox.task())
                    } else {
                        None
                    };
                    self.enqueue(ContextRequest { guti, pti, op, reply_to });
                }
                NasAction::EmmSap(primitive) => {
                    if let Err(e) = self.emm_sap.send(primitive) {
                        log_failure("emm_sap_send", &e);
                    }
                }
            }
        }
    }

    fn enqueue(&mut self, req: ContextRequest) {
        debug!(guti = %req.guti, pti = req.pti, op = req.op.name(), queued = self.outbox.len(), "Context request queued");
        self.outbox.push_back(req);
    }

    /// GUTI_MSG from another task. A reply addressed to this task needs a
    /// pending entry, or it would be dropped on arrival.
    fn forward_external(&mut self, req: ContextRequest) {
        if req.reply_to == Some(self.mailbox.task()) {
            if let Err(e) = self.pending.register(req.guti, req.pti) {
                log_failure("context_request", &e);
                return;
            }
        }
        self.enqueue(req);
    }

    async fn nas_exit(&mut self) {
        debug!("Cleaning NAS task interface");
        self.proc.cleanup().await;
        debug!(
            pending = self.pending.len(),
            unsent = self.outbox.len(),
            "Cleaning NAS task interface: DONE"
        );
    }
}

fn log_failure(handler: &'static str, e: &NasError) {
    match e.severity() {
        ErrorSeverity::Info => debug!(handler, error = %e, "Handler failed"),
        ErrorSeverity::Warning => warn!(handler, error = %e, "Handler failed"),
        ErrorSeverity::Error | ErrorSeverity::Critical => error!(handler, error = %e, "Handler failed"),
    }
}
