//! EMM-SAP primitive tag space.
//!
//! Four disjoint families share one numbering. Each family owns the open
//! interval `(MIN, MAX)`; the sentinels themselves are not valid primitives.

pub type EmmPrimitive = u32;

// EMMREG-SAP (registration)
pub const EMMREG_PRIMITIVE_MIN: EmmPrimitive = 0;
pub const EMMREG_COMMON_PROC_REQ: EmmPrimitive = 1;
pub const EMMREG_COMMON_PROC_CNF: EmmPrimitive = 2;
pub const EMMREG_COMMON_PROC_REJ: EmmPrimitive = 3;
pub const EMMREG_COMMON_PROC_ABORT: EmmPrimitive = 4;
pub const EMMREG_ATTACH_CNF: EmmPrimitive = 5;
pub const EMMREG_ATTACH_REJ: EmmPrimitive = 6;
pub const EMMREG_ATTACH_ABORT: EmmPrimitive = 7;
pub const EMMREG_DETACH_INIT: EmmPrimitive = 8;
pub const EMMREG_DETACH_REQ: EmmPrimitive = 9;
pub const EMMREG_DETACH_FAILED: EmmPrimitive = 10;
pub const EMMREG_DETACH_CNF: EmmPrimitive = 11;
pub const EMMREG_TAU_REQ: EmmPrimitive = 12;
pub const EMMREG_TAU_CNF: EmmPrimitive = 13;
pub const EMMREG_TAU_REJ: EmmPrimitive = 14;
pub const EMMREG_SERVICE_REQ: EmmPrimitive = 15;
pub const EMMREG_SERVICE_CNF: EmmPrimitive = 16;
pub const EMMREG_SERVICE_REJ: EmmPrimitive = 17;
pub const EMMREG_LOWERLAYER_SUCCESS: EmmPrimitive = 18;
pub const EMMREG_LOWERLAYER_FAILURE: EmmPrimitive = 19;
pub const EMMREG_LOWERLAYER_RELEASE: EmmPrimitive = 20;
pub const EMMREG_LOWERLAYER_NON_DELIVERY: EmmPrimitive = 21;
pub const EMMREG_PRIMITIVE_MAX: EmmPrimitive = 100;

// EMMESM-SAP (session management interworking)
pub const EMMESM_PRIMITIVE_MIN: EmmPrimitive = 100;
pub const EMMESM_RELEASE_IND: EmmPrimitive = 101;
pub const EMMESM_UNITDATA_REQ: EmmPrimitive = 102;
pub const EMMESM_UNITDATA_IND: EmmPrimitive = 103;
pub const EMMESM_PRIMITIVE_MAX: EmmPrimitive = 200;

// EMMAS-SAP (access stratum)
pub const EMMAS_PRIMITIVE_MIN: EmmPrimitive = 200;
pub const EMMAS_SECURITY_REQ: EmmPrimitive = 201;
pub const EMMAS_SECURITY_IND: EmmPrimitive = 202;
pub const EMMAS_SECURITY_RES: EmmPrimitive = 203;
pub const EMMAS_SECURITY_REJ: EmmPrimitive = 204;
pub const EMMAS_ESTABLISH_REQ: EmmPrimitive = 205;
pub const EMMAS_ESTABLISH_CNF: EmmPrimitive = 206;
pub const EMMAS_ESTABLISH_REJ: EmmPrimitive = 207;
pub const EMMAS_RELEASE_REQ: EmmPrimitive = 208;
pub const EMMAS_RELEASE_IND: EmmPrimitive = 209;
pub const EMMAS_ERROR_IND: EmmPrimitive = 210;
pub const EMMAS_PAGE_IND: EmmPrimitive = 211;
pub const EMMAS_DATA_REQ: EmmPrimitive = 212;
pub const EMMAS_DATA_IND: EmmPrimitive = 213;
pub const EMMAS_STATUS_IND: EmmPrimitive = 214;
pub const EMMAS_PRIMITIVE_MAX: EmmPrimitive = 300;

// EMMCN-SAP (core network interworking)
pub const EMMCN_PRIMITIVE_MIN: EmmPrimitive = 300;
pub const EMMCN_AUTHENTICATION_PARAM_RES: EmmPrimitive = 301;
pub const EMMCN_AUTHENTICATION_PARAM_FAIL: EmmPrimitive = 302;
pub const EMMCN_ULA_SUCCESS: EmmPrimitive = 303;
pub const EMMCN_CLR: EmmPrimitive = 304;
pub const EMMCN_ULA_OR_CSRSP_FAIL: EmmPrimitive = 305;
pub const EMMCN_CS_RESPONSE_SUCCESS: EmmPrimitive = 306;
pub const EMMCN_ACTIVATE_DEDICATED_BEARER_REQ: EmmPrimitive = 307;
pub const EMMCN_IMPLICIT_DETACH_UE: EmmPrimitive = 308;
pub const EMMCN_SMC_PROC_FAIL: EmmPrimitive = 309;
pub const EMMCN_PRIMITIVE_MAX: EmmPrimitive = 400;

/// Sub-SAP family owning a slice of the primitive space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SapFamily {
    Reg,
    Esm,
    As,
    Cn,
}

impl SapFamily {
    pub const ALL: [SapFamily; 4] = [SapFamily::Reg, SapFamily::Esm, SapFamily::As, SapFamily::Cn];

    /// Exclusive `(min, max)` sentinels of the family.
    pub fn bounds(self) -> (EmmPrimitive, EmmPrimitive) {
        match self {
            SapFamily::Reg => (EMMREG_PRIMITIVE_MIN, EMMREG_PRIMITIVE_MAX),
            SapFamily::Esm => (EMMESM_PRIMITIVE_MIN, EMMESM_PRIMITIVE_MAX),
            SapFamily::As => (EMMAS_PRIMITIVE_MIN, EMMAS_PRIMITIVE_MAX),
            SapFamily::Cn => (EMMCN_PRIMITIVE_MIN, EMMCN_PRIMITIVE_MAX),
        }
    }

    pub fn contains(self, primitive: EmmPrimitive) -> bool {
        let (min, max) = self.bounds();
        primitive > min && primitive < max
    }

    pub fn name(self) -> &'static str {
        match self {
            SapFamily::Reg => "EMMREG",
            SapFamily::Esm => "EMMESM",
            SapFamily::As => "EMMAS",
            SapFamily::Cn => "EMMCN",
        }
    }
}

impl std::fmt::Display for SapFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
