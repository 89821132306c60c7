#![allow(dead_code)]

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use mnas_config::NasConfig;
use mnas_core::messages::{
    AuthInfoAns, ContextReply, ContextRequest, CreateDedicatedBearerReq, EstablishRej,
    PdnConfigRsp, PdnConnectivityFail, PdnConnectivityRsp, TimerExpiry,
};
use mnas_core::{Mailbox, MessageDef, MessagePayload, Result, TaskId};
use mnas_emm_core::{EmmSap, SubSapRouter};
use mnas_esm_core::EsmInformationProc;
use mnas_runtime::{nas_init, NasAction, NasCollaborators, NasProc, NasRuntime, ProcResult};
use mnas_shared::{
    ContextOp, ContextResult, Guti, MmeUeS1apId, PlmnId, ProcTid, SubSapPrimitive, TimerArg,
};
use tokio::sync::mpsc;

pub fn guti(m_tmsi: u32) -> Guti {
    let plmn = PlmnId { mcc: 208, mnc: 93, mnc_digits: 2 };
    Guti::new(plmn, 4, 1, m_tmsi)
}

pub struct NullRouter;

impl SubSapRouter for NullRouter {
    fn send(&mut self, _primitive: SubSapPrimitive) -> Result<()> {
        Ok(())
    }
}

pub fn null_emm_sap() -> EmmSap {
    EmmSap::new(
        Box::new(NullRouter),
        Box::new(NullRouter),
        Box::new(NullRouter),
        Box::new(NullRouter),
    )
}

/// Never follows up on a T3489 expiry; records each one instead.
pub struct ExpiryLog(pub mpsc::UnboundedSender<(Guti, TimerArg)>);

impl EsmInformationProc for ExpiryLog {
    fn on_t3489_expiry(&mut self, guti: &Guti, arg: &TimerArg) -> Option<ContextOp> {
        let _ = self.0.send((*guti, arg.clone()));
        None
    }
}

pub struct Quiet;

impl EsmInformationProc for Quiet {
    fn on_t3489_expiry(&mut self, _guti: &Guti, _arg: &TimerArg) -> Option<ContextOp> {
        None
    }
}

/// Procedure layer that answers each PDN config response with the next
/// scripted batch of actions and reports every context reply.
pub struct ScriptedProc {
    script: VecDeque<Vec<NasAction>>,
    replies: mpsc::UnboundedSender<ContextReply>,
    pub cleaned_up: bool,
}

impl ScriptedProc {
    pub fn new(
        script: Vec<Vec<NasAction>>,
    ) -> (Self, mpsc::UnboundedReceiver<ContextReply>) {
        let (replies, rx) = mpsc::unbounded_channel();
        let proc = Self {
            script: script.into(),
            replies,
            cleaned_up: false,
        };
        (proc, rx)
    }
}

#[async_trait]
impl NasProc for ScriptedProc {
    async fn emm_attach_reject(&mut self, _rej: &EstablishRej) -> ProcResult {
        Ok(vec![])
    }

    async fn create_dedicated_bearer(&mut self, _req: &CreateDedicatedBearerReq) -> ProcResult {
        Ok(vec![])
    }

    async fn dl_transfer_cnf(&mut self, _ue_id: MmeUeS1apId, _err_code: u32, _nas_msg: &Bytes) -> ProcResult {
        Ok(vec![])
    }

    async fn dl_transfer_rej(&mut self, _ue_id: MmeUeS1apId, _err_code: u32, _nas_msg: &Bytes) -> ProcResult {
        Ok(vec![])
    }

    async fn pdn_config_res(&mut self, _rsp: &PdnConfigRsp) -> ProcResult {
        Ok(self.script.pop_front().unwrap_or_default())
    }

    async fn pdn_connectivity_fail(&mut self, _fail: &PdnConnectivityFail) -> ProcResult {
        Ok(vec![])
    }

    async fn pdn_connectivity_res(&mut self, _rsp: &PdnConnectivityRsp) -> ProcResult {
        Ok(vec![])
    }

    async fn implicit_detach_ue_ind(&mut self, _ue_id: MmeUeS1apId) -> ProcResult {
        Ok(vec![])
    }

    async fn deregister_ue(&mut self, _ue_id: MmeUeS1apId) -> ProcResult {
        Ok(vec![])
    }

    async fn authentication_info_answer(&mut self, _ans: &AuthInfoAns) -> ProcResult {
        Ok(vec![])
    }

    async fn timer_expired(&mut self, _expiry: &TimerExpiry) -> ProcResult {
        Ok(vec![])
    }

    async fn context_reply(&mut self, reply: &ContextReply) -> ProcResult {
        let _ = self.replies.send(reply.clone());
        Ok(vec![])
    }

    async fn cleanup(&mut self) {
        self.cleaned_up = true;
    }
}

pub fn config() -> NasConfig {
    NasConfig {
        t3489_sec: 4,
        mailbox_capacity: 64,
        reply_timeout_ms: 5000,
    }
}

pub async fn start(
    proc: ScriptedProc,
    esm_info: Box<dyn EsmInformationProc>,
) -> (NasRuntime<ScriptedProc>, Mailbox) {
    start_with_config(&config(), proc, esm_info).await
}

pub async fn start_with_config(
    config: &NasConfig,
    proc: ScriptedProc,
    esm_info: Box<dyn EsmInformationProc>,
) -> (NasRuntime<ScriptedProc>, Mailbox) {
    let collaborators = NasCollaborators {
        emm_sap: null_emm_sap(),
        proc,
        esm_info,
    };
    let mut runtime = nas_init(config, collaborators, &[TaskId::MmeApp])
        .await
        .unwrap();
    let peer = runtime.take_mailbox(TaskId::MmeApp).unwrap();
    (runtime, peer)
}

pub fn context(guti: Guti, pti: ProcTid, op: ContextOp) -> NasAction {
    NasAction::Context { guti, pti, op, await_reply: true }
}

/// Send a context request on behalf of MME_APP and wait for its reply.
pub async fn request(
    runtime: &NasRuntime<ScriptedProc>,
    peer: &mut Mailbox,
    guti: Guti,
    pti: ProcTid,
    op: ContextOp,
) -> ContextResult {
    let req = ContextRequest { guti, pti, op, reply_to: Some(TaskId::MmeApp) };
    runtime
        .itti()
        .send_msg_to_task(TaskId::GutiReceiver, MessageDef::new(TaskId::MmeApp, MessagePayload::GutiMsg(req)))
        .await
        .unwrap();

    let msg = tokio::time::timeout(Duration::from_secs(5), peer.recv())
        .await
        .unwrap()
        .unwrap();
    let result = match &msg.payload {
        MessagePayload::ContextRtn(reply) => {
            assert_eq!((reply.guti, reply.pti), (guti, pti));
            reply.result.clone()
        }
        other => panic!("Unexpected message: {:?}", other.id()),
    };
    runtime.itti().release(msg);
    result
}
