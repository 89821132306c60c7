use mnas_core::messages::Completion;
use mnas_shared::{
    ContextResult, DisconnectDecision, DisconnectOutcome, EsmCause, PdnCid, MAX_APN_PER_UE,
};

/// Decide a PDN disconnect from the active-PDN snapshot taken by the
/// context owner. The last PDN of a UE may not be disconnected.
pub fn decide_disconnect(active_pdns: u32, pdn_cid: PdnCid, cause: EsmCause) -> DisconnectDecision {
    if active_pdns > 1 {
        if usize::from(pdn_cid) >= MAX_APN_PER_UE {
            return DisconnectDecision {
                outcome: DisconnectOutcome::Normal,
                pdn_cid: None,
                cause: EsmCause::ProtocolError,
            };
        }
        DisconnectDecision {
            outcome: DisconnectOutcome::Normal,
            pdn_cid: Some(pdn_cid),
            cause,
        }
    } else {
        DisconnectDecision {
            outcome: DisconnectOutcome::LastPdnDisconnectionNotAllowed,
            pdn_cid: None,
            cause: EsmCause::LastPdnDisconnectionNotAllowed,
        }
    }
}

/// Turn a completion into the reply the requester receives.
pub fn to_result(completion: Completion) -> ContextResult {
    match completion {
        Completion::Applied => ContextResult::Applied,
        Completion::NotFound => ContextResult::NotFound,
        Completion::AlreadyExists => ContextResult::AlreadyExists,
        Completion::StaleTimer => ContextResult::StaleTimer,
        Completion::Disconnect {
            active_pdns,
            pdn_cid,
            cause,
        } => ContextResult::Disconnect(decide_disconnect(active_pdns, pdn_cid, cause)),
    }
}
