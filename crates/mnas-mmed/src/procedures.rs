use async_trait::async_trait;
use bytes::Bytes;
use mnas_core::messages::{
    AuthInfoAns, ContextReply, CreateDedicatedBearerReq, EstablishRej, PdnConfigRsp,
    PdnConnectivityFail, PdnConnectivityRsp, TimerExpiry,
};
use mnas_core::Result;
use mnas_emm_core::SubSapRouter;
use mnas_runtime::{NasProc, ProcResult};
use mnas_shared::{MmeUeS1apId, SapFamily, SubSapPrimitive};
use tracing::{debug, info};

/// Sub-SAP that only traces what it is given.
pub struct TracingSubSap {
    family: SapFamily,
}

impl TracingSubSap {
    pub fn new(family: SapFamily) -> Self {
        Self { family }
    }
}

impl SubSapRouter for TracingSubSap {
    fn initialize(&mut self) {
        debug!(sap = self.family.name(), "Sub-SAP initialized");
    }

    fn send(&mut self, primitive: SubSapPrimitive) -> Result<()> {
        info!(
            sap = self.family.name(),
            primitive = primitive.primitive,
            ue_id = primitive.ue_id,
            len = primitive.data.len(),
            "Primitive received"
        );
        Ok(())
    }
}

/// Procedure layer stand-in. Logs each indication and requests nothing.
#[derive(Default)]
pub struct TracingProc;

#[async_trait]
impl NasProc for TracingProc {
    async fn emm_attach_reject(&mut self, rej: &EstablishRej) -> ProcResult {
        info!(ue_id = rej.ue_id, emm_cause = rej.emm_cause, "Attach reject");
        Ok(vec![])
    }

    async fn create_dedicated_bearer(&mut self, req: &CreateDedicatedBearerReq) -> ProcResult {
        info!(ue_id = req.ue_id, ebi = req.ebi, linked_ebi = req.linked_ebi, qci = req.qci, "Create dedicated bearer");
        Ok(vec![])
    }

    async fn dl_transfer_cnf(&mut self, ue_id: MmeUeS1apId, err_code: u32, nas_msg: &Bytes) -> ProcResult {
        info!(ue_id, err_code, len = nas_msg.len(), "Downlink transfer confirmed");
        Ok(vec![])
    }

    async fn dl_transfer_rej(&mut self, ue_id: MmeUeS1apId, err_code: u32, nas_msg: &Bytes) -> ProcResult {
        info!(ue_id, err_code, len = nas_msg.len(), "Downlink transfer rejected");
        Ok(vec![])
    }

    async fn pdn_config_res(&mut self, rsp: &PdnConfigRsp) -> ProcResult {
        info!(ue_id = rsp.ue_id, imsi = %rsp.imsi, "PDN config response");
        Ok(vec![])
    }

    async fn pdn_connectivity_fail(&mut self, fail: &PdnConnectivityFail) -> ProcResult {
        info!(ue_id = fail.ue_id, pti = fail.pti, cause = fail.cause.code(), "PDN connectivity failure");
        Ok(vec![])
    }

    async fn pdn_connectivity_res(&mut self, rsp: &PdnConnectivityRsp) -> ProcResult {
        info!(ue_id = rsp.ue_id, pti = rsp.pti, pdn_cid = rsp.pdn_cid, apn = %rsp.apn, "PDN connectivity response");
        Ok(vec![])
    }

    async fn implicit_detach_ue_ind(&mut self, ue_id: MmeUeS1apId) -> ProcResult {
        info!(ue_id, "Implicit detach");
        Ok(vec![])
    }

    async fn deregister_ue(&mut self, ue_id: MmeUeS1apId) -> ProcResult {
        info!(ue_id, "Deregister UE");
        Ok(vec![])
    }

    async fn authentication_info_answer(&mut self, ans: &AuthInfoAns) -> ProcResult {
        info!(imsi = %ans.imsi, result = ans.result, "Authentication info answer");
        Ok(vec![])
    }

    async fn timer_expired(&mut self, expiry: &TimerExpiry) -> ProcResult {
        info!(timer_id = expiry.timer_id, handler = ?expiry.handler, "Timer expired");
        Ok(vec![])
    }

    async fn context_reply(&mut self, reply: &ContextReply) -> ProcResult {
        debug!(guti = %reply.guti, pti = reply.pti, result = ?reply.result, "Context reply");
        Ok(vec![])
    }

    async fn cleanup(&mut self) {
        info!("NAS procedures cleaned up");
    }
}
