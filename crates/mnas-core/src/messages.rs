use bytes::Bytes;
use mnas_shared::{
    Apn, ContextOp, ContextResult, EmmSapMessage, EsmCause, Guti, MmeUeS1apId, Pco, PdnCid,
    ProcTid, TimerArg, TimerHandler, TimerId,
};

use crate::itti::TaskId;

/// MME_APP_CREATE_DEDICATED_BEARER_REQ
#[derive(Debug, Clone, PartialEq)]
pub struct CreateDedicatedBearerReq {
    pub ue_id: MmeUeS1apId,
    pub cid: PdnCid,
    pub ebi: u8,
    pub linked_ebi: u8,
    pub qci: u8,
    pub tft: Bytes,
    pub pco: Pco,
}

/// NAS_DOWNLINK_DATA_CNF / NAS_DOWNLINK_DATA_REJ
#[derive(Debug, Clone, PartialEq)]
pub struct DownlinkDataStatus {
    pub ue_id: MmeUeS1apId,
    pub err_code: u32,
    pub nas_msg: Bytes,
}

/// NAS_PDN_CONFIG_RSP
#[derive(Debug, Clone, PartialEq)]
pub struct PdnConfigRsp {
    pub ue_id: MmeUeS1apId,
    pub imsi: String,
}

/// NAS_PDN_CONNECTIVITY_FAIL
#[derive(Debug, Clone, PartialEq)]
pub struct PdnConnectivityFail {
    pub ue_id: MmeUeS1apId,
    pub pti: ProcTid,
    pub cause: EsmCause,
}

/// NAS_PDN_CONNECTIVITY_RSP
#[derive(Debug, Clone, PartialEq)]
pub struct PdnConnectivityRsp {
    pub ue_id: MmeUeS1apId,
    pub pti: ProcTid,
    pub pdn_cid: PdnCid,
    pub ebi: u8,
    pub apn: Apn,
    pub pdn_type: u8,
    pub paa: Bytes,
    pub pco: Pco,
}

/// S6A_AUTH_INFO_ANS
#[derive(Debug, Clone, PartialEq)]
pub struct AuthInfoAns {
    pub imsi: String,
    pub result: u32,
    pub vectors: Bytes,
}

/// NAS_EMMAS_ESTABLISH_REJ
#[derive(Debug, Clone, PartialEq)]
pub struct EstablishRej {
    pub ue_id: MmeUeS1apId,
    pub emm_cause: u8,
}

/// TIMER_HAS_EXPIRED
#[derive(Debug, Clone, PartialEq)]
pub struct TimerExpiry {
    pub timer_id: TimerId,
    pub handler: TimerHandler,
    pub arg: TimerArg,
}

/// GUTI_MSG: a mutation addressed to the session context owner.
///
/// `reply_to` names the mailbox that receives the `ContextReply` for this
/// request; `None` makes the request fire-and-forget.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextRequest {
    pub guti: Guti,
    pub pti: ProcTid,
    pub op: ContextOp,
    pub reply_to: Option<TaskId>,
}

/// What the context owner observed while applying a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Applied,
    NotFound,
    AlreadyExists,
    StaleTimer,
    // Active PDN count is a snapshot taken when the request was applied
    Disconnect {
        active_pdns: u32,
        pdn_cid: PdnCid,
        cause: EsmCause,
    },
}

/// GUTI_RTN: completion handed from the context owner to the relay.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionNotification {
    pub guti: Guti,
    pub pti: ProcTid,
    pub reply_to: TaskId,
    pub completion: Completion,
}

/// CONTEXT_RTN: final reply, correlated by (guti, pti).
#[derive(Debug, Clone, PartialEq)]
pub struct ContextReply {
    pub guti: Guti,
    pub pti: ProcTid,
    pub result: ContextResult,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessagePayload {
    EmmSap(EmmSapMessage),
    EmmReg(EmmSapMessage),
    NasEmmAsEstablishRej(EstablishRej),
    MessageTest,
    CreateDedicatedBearerReq(CreateDedicatedBearerReq),
    NasDownlinkDataCnf(DownlinkDataStatus),
    NasDownlinkDataRej(DownlinkDataStatus),
    NasPdnConfigRsp(PdnConfigRsp),
    NasPdnConnectivityFail(PdnConnectivityFail),
    NasPdnConnectivityRsp(PdnConnectivityRsp),
    NasImplicitDetachUeInd { ue_id: MmeUeS1apId },
    S1apDeregisterUeReq { mme_ue_s1ap_id: MmeUeS1apId },
    S6aAuthInfoAns(AuthInfoAns),
    TimerHasExpired(TimerExpiry),
    GutiMsg(ContextRequest),
    GutiRtn(CompletionNotification),
    ContextRtn(ContextReply),
    Terminate,
    // Message of another subsystem that NAS does not decode
    Foreign { id: u16, data: Bytes },
}

/// Discriminant tag of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    EmmSap,
    EmmReg,
    NasEmmAsEstablishRej,
    MessageTest,
    CreateDedicatedBearerReq,
    NasDownlinkDataCnf,
    NasDownlinkDataRej,
    NasPdnConfigRsp,
    NasPdnConnectivityFail,
    NasPdnConnectivityRsp,
    NasImplicitDetachUeInd,
    S1apDeregisterUeReq,
    S6aAuthInfoAns,
    TimerHasExpired,
    GutiMsg,
    GutiRtn,
    ContextRtn,
    Terminate,
    Foreign(u16),
}

impl MessagePayload {
    pub fn id(&self) -> MessageId {
        match self {
            Self::EmmSap(_) => MessageId::EmmSap,
            Self::EmmReg(_) => MessageId::EmmReg,
            Self::NasEmmAsEstablishRej(_) => MessageId::NasEmmAsEstablishRej,
            Self::MessageTest => MessageId::MessageTest,
            Self::CreateDedicatedBearerReq(_) => MessageId::CreateDedicatedBearerReq,
            Self::NasDownlinkDataCnf(_) => MessageId::NasDownlinkDataCnf,
            Self::NasDownlinkDataRej(_) => MessageId::NasDownlinkDataRej,
            Self::NasPdnConfigRsp(_) => MessageId::NasPdnConfigRsp,
            Self::NasPdnConnectivityFail(_) => MessageId::NasPdnConnectivityFail,
            Self::NasPdnConnectivityRsp(_) => MessageId::NasPdnConnectivityRsp,
            Self::NasImplicitDetachUeInd { .. } => MessageId::NasImplicitDetachUeInd,
            Self::S1apDeregisterUeReq { .. } => MessageId::S1apDeregisterUeReq,
            Self::S6aAuthInfoAns(_) => MessageId::S6aAuthInfoAns,
            Self::TimerHasExpired(_) => MessageId::TimerHasExpired,
            Self::GutiMsg(_) => MessageId::GutiMsg,
            Self::GutiRtn(_) => MessageId::GutiRtn,
            Self::ContextRtn(_) => MessageId::ContextRtn,
            Self::Terminate => MessageId::Terminate,
            Self::Foreign { id, .. } => MessageId::Foreign(*id),
        }
    }
}

impl MessageId {
    pub fn name(self) -> &'static str {
        match self {
            Self::EmmSap => "EMM_SAP",
            Self::EmmReg => "EMM_REG_MSG",
            Self::NasEmmAsEstablishRej => "NAS_EMMAS_ESTABLISH_REJ",
            Self::MessageTest => "MESSAGE_TEST",
            Self::CreateDedicatedBearerReq => "MME_APP_CREATE_DEDICATED_BEARER_REQ",
            Self::NasDownlinkDataCnf => "NAS_DOWNLINK_DATA_CNF",
            Self::NasDownlinkDataRej => "NAS_DOWNLINK_DATA_REJ",
            Self::NasPdnConfigRsp => "NAS_PDN_CONFIG_RSP",
            Self::NasPdnConnectivityFail => "NAS_PDN_CONNECTIVITY_FAIL",
            Self::NasPdnConnectivityRsp => "NAS_PDN_CONNECTIVITY_RSP",
            Self::NasImplicitDetachUeInd => "NAS_IMPLICIT_DETACH_UE_IND",
            Self::S1apDeregisterUeReq => "S1AP_DEREGISTER_UE_REQ",
            Self::S6aAuthInfoAns => "S6A_AUTH_INFO_ANS",
            Self::TimerHasExpired => "TIMER_HAS_EXPIRED",
            Self::GutiMsg => "GUTI_MSG",
            Self::GutiRtn => "GUTI_RTN",
            Self::ContextRtn => "CONTEXT_RTN",
            Self::Terminate => "TERMINATE_MESSAGE",
            Self::Foreign(_) => "FOREIGN",
        }
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Foreign(id) => write!(f, "FOREIGN({id})"),
            other => f.write_str(other.name()),
        }
    }
}
