use bytes::Bytes;
use std::fmt;
use std::time::Duration;

pub mod primitive;

pub use primitive::{EmmPrimitive, SapFamily};

// S1AP UE identifier assigned by the MME
pub type MmeUeS1apId = u32;
pub const INVALID_MME_UE_S1AP_ID: MmeUeS1apId = 0xffff_ffff;

// Procedure transaction identity (PTI)
pub type ProcTid = u8;
pub const PROCEDURE_TRANSACTION_IDENTITY_UNASSIGNED: ProcTid = 0;

// PDN connection identifier
pub type PdnCid = u8;
pub const MAX_APN_PER_UE: usize = 5;

pub type TimerId = u64;

// T3489: ESM information request retransmission timer (TS 24.301 Table 10.3.1)
pub const T3489_DEFAULT: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PlmnId {
    pub mcc: u16,
    pub mnc: u16,
    pub mnc_digits: u8,
}

impl fmt::Display for PlmnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mnc_digits == 3 {
            write!(f, "{:03}{:03}", self.mcc, self.mnc)
        } else {
            write!(f, "{:03}{:02}", self.mcc, self.mnc)
        }
    }
}

/// Globally Unique Temporary Identity, the key of a session context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Guti {
    pub plmn: PlmnId,
    pub mme_gid: u16,
    pub mme_code: u8,
    pub m_tmsi: u32,
}

impl Guti {
    pub fn new(plmn: PlmnId, mme_gid: u16, mme_code: u8, m_tmsi: u32) -> Self {
        Self { plmn, mme_gid, mme_code, m_tmsi }
    }
}

impl fmt::Display for Guti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:04x}-{:02x}-{:08x}",
            self.plmn, self.mme_gid, self.mme_code, self.m_tmsi
        )
    }
}

/// Access point name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Apn(String);

impl Apn {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Apn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcoContainer {
    pub protocol_id: u16,
    pub contents: Bytes,
}

/// Protocol Configuration Options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pco {
    pub config_protocol: u8,
    pub containers: Vec<PcoContainer>,
}

impl Pco {
    pub fn num_protocol_or_container_id(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn clear(&mut self) {
        self.config_protocol = 0;
        self.containers.clear();
    }
}

/// ESM cause values (TS 24.301 9.9.4.4)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EsmCause {
    Success,
    RegularDeactivation,
    LastPdnDisconnectionNotAllowed,
    InvalidPtiValue,
    ProtocolError,
    Other(u8),
}

impl EsmCause {
    pub fn code(self) -> u8 {
        match self {
            EsmCause::Success => 0,
            EsmCause::RegularDeactivation => 36,
            EsmCause::LastPdnDisconnectionNotAllowed => 49,
            EsmCause::InvalidPtiValue => 81,
            EsmCause::ProtocolError => 111,
            EsmCause::Other(code) => code,
        }
    }
}

impl From<u8> for EsmCause {
    fn from(code: u8) -> Self {
        match code {
            0 => EsmCause::Success,
            36 => EsmCause::RegularDeactivation,
            49 => EsmCause::LastPdnDisconnectionNotAllowed,
            81 => EsmCause::InvalidPtiValue,
            111 => EsmCause::ProtocolError,
            other => EsmCause::Other(other),
        }
    }
}

/// Primitive as it enters the EMM Service Access Point.
#[derive(Debug, Clone, PartialEq)]
pub struct EmmSapMessage {
    pub primitive: EmmPrimitive,
    pub ue_id: MmeUeS1apId,
    pub data: Bytes,
}

impl EmmSapMessage {
    pub fn new(primitive: EmmPrimitive, ue_id: MmeUeS1apId) -> Self {
        Self { primitive, ue_id, data: Bytes::new() }
    }
}

/// Primitive after classification, addressed to one sub-SAP.
#[derive(Debug, Clone, PartialEq)]
pub struct SubSapPrimitive {
    pub family: SapFamily,
    pub primitive: EmmPrimitive,
    pub ue_id: MmeUeS1apId,
    pub data: Bytes,
}

/// Expiry handler selected when a timer is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerHandler {
    // Bound to a session context; expiry is checked against the context's slot
    EsmInformationT3489,
    // Owned by the procedure layer
    Procedure(u16),
}

/// Opaque argument captured at start time and returned on expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerArg {
    pub guti: Guti,
    pub ue_id: MmeUeS1apId,
    pub ebi: u8,
    pub count: u8,
}

/// Initial values of a freshly created session context.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextInit {
    pub t3489: Duration,
}

impl Default for ContextInit {
    fn default() -> Self {
        Self { t3489: T3489_DEFAULT }
    }
}

/// Mutation applied by the context owner.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextOp {
    Create(ContextInit),
    BindApn(Apn),
    ReplacePco(Pco),
    StopTimer,
    ClearTimerId,
    StartTimer { duration: Option<Duration>, arg: TimerArg },
    IncrementPdnCount,
    ActivatePdn,
    DeactivatePdn,
    RequestDisconnect { pdn_cid: PdnCid, cause: EsmCause },
    TimerExpired { timer_id: TimerId, arg: TimerArg },
    Release,
}

impl ContextOp {
    pub fn name(&self) -> &'static str {
        match self {
            ContextOp::Create(_) => "create",
            ContextOp::BindApn(_) => "bind-apn",
            ContextOp::ReplacePco(_) => "replace-pco",
            ContextOp::StopTimer => "stop-timer",
            ContextOp::ClearTimerId => "clear-timer-id",
            ContextOp::StartTimer { .. } => "start-timer",
            ContextOp::IncrementPdnCount => "increment-pdn-count",
            ContextOp::ActivatePdn => "activate-pdn",
            ContextOp::DeactivatePdn => "deactivate-pdn",
            ContextOp::RequestDisconnect { .. } => "request-disconnect",
            ContextOp::TimerExpired { .. } => "timer-expired",
            ContextOp::Release => "release",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectOutcome {
    Normal,
    LastPdnDisconnectionNotAllowed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisconnectDecision {
    pub outcome: DisconnectOutcome,
    pub pdn_cid: Option<PdnCid>,
    pub cause: EsmCause,
}

/// Result delivered back to the requester of a context operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextResult {
    Applied,
    NotFound,
    AlreadyExists,
    StaleTimer,
    Disconnect(DisconnectDecision),
    TimedOut,
}
