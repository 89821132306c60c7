use mnas_shared::{Apn, ContextInit, Pco, TimerId};
use std::time::Duration;

/// Timer slot of a context. `id == None` is the inactive state.
#[derive(Debug, Clone, PartialEq)]
pub struct NasTimer {
    pub id: Option<TimerId>,
    pub duration: Duration,
}

impl NasTimer {
    pub fn is_active(&self) -> bool {
        self.id.is_some()
    }
}

/// ESM session context of one subscriber
#[derive(Debug, Clone, PartialEq)]
pub struct EsmContext {
    pub(crate) apn: Option<Apn>,
    pub(crate) pco: Pco,
    pub(crate) n_pdns: u32,
    pub(crate) n_active_pdns: u32,
    pub(crate) t3489: NasTimer,
}

impl EsmContext {
    pub fn new(init: ContextInit) -> Self {
        Self {
            apn: None,
            pco: Pco::default(),
            n_pdns: 0,
            n_active_pdns: 0,
            t3489: NasTimer {
                id: None,
                duration: init.t3489,
            },
        }
    }

    pub fn apn(&self) -> Option<&Apn> {
        self.apn.as_ref()
    }

    pub fn pco(&self) -> &Pco {
        &self.pco
    }

    pub fn n_pdns(&self) -> u32 {
        self.n_pdns
    }

    pub fn n_active_pdns(&self) -> u32 {
        self.n_active_pdns
    }

    pub fn t3489(&self) -> &NasTimer {
        &self.t3489
    }
}
