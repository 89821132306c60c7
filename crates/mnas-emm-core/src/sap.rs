use mnas_core::{NasError, Result};
use mnas_shared::{EmmPrimitive, EmmSapMessage, SapFamily, SubSapPrimitive};
use tracing::{debug, warn};

/// One of the four EMM sub-SAPs (EMMREG, EMMESM, EMMAS, EMMCN).
#[cfg_attr(test, mockall::automock)]
pub trait SubSapRouter: Send {
    /// Called once from [`EmmSap::initialize`].
    fn initialize(&mut self) {}

    fn send(&mut self, primitive: SubSapPrimitive) -> Result<()>;
}

/// Sub-SAP family owning `primitive`, if any. Range bounds are exclusive.
pub fn classify(primitive: EmmPrimitive) -> Option<SapFamily> {
    SapFamily::ALL.into_iter().find(|family| family.contains(primitive))
}

/// EMM Service Access Point.
///
/// Holds no state of its own; it only decides which sub-SAP gets a primitive.
pub struct EmmSap {
    reg: Box<dyn SubSapRouter>,
    esm: Box<dyn SubSapRouter>,
    as_sap: Box<dyn SubSapRouter>,
    cn: Box<dyn SubSapRouter>,
}

impl EmmSap {
    pub fn new(
        reg: Box<dyn SubSapRouter>,
        esm: Box<dyn SubSapRouter>,
        as_sap: Box<dyn SubSapRouter>,
        cn: Box<dyn SubSapRouter>,
    ) -> Self {
        Self { reg, esm, as_sap, cn }
    }

    /// EMMCN needs no initialisation.
    pub fn initialize(&mut self) {
        self.reg.initialize();
        self.esm.initialize();
        self.as_sap.initialize();
    }

    /// Classify the primitive and forward it to the owning sub-SAP.
    pub fn send(&mut self, msg: EmmSapMessage) -> Result<()> {
        let Some(family) = classify(msg.primitive) else {
            warn!(primitive = msg.primitive, "EMM-SAP - Out of range primitive");
            mnas_metrics::SAP_OUT_OF_RANGE_TOTAL.inc();
            return Err(NasError::OutOfRangePrimitive(msg.primitive));
        };
        self.forward(family, msg)
    }

    /// EMM_REG_MSG bypasses classification and goes straight to EMMREG.
    pub fn reg_send(&mut self, msg: EmmSapMessage) -> Result<()> {
        self.forward(SapFamily::Reg, msg)
    }

    fn forward(&mut self, family: SapFamily, msg: EmmSapMessage) -> Result<()> {
        debug!(sap = family.name(), primitive = msg.primitive, ue_id = msg.ue_id, "EMM-SAP - Forward");
        mnas_metrics::SAP_PRIMITIVES_TOTAL
            .with_label_values(&[family.name()])
            .inc();

        let primitive = SubSapPrimitive {
            family,
            primitive: msg.primitive,
            ue_id: msg.ue_id,
            data: msg.data,
        };
        let router = match family {
            SapFamily::Reg => &mut self.reg,
            SapFamily::Esm => &mut self.esm,
            SapFamily::As => &mut self.as_sap,
            SapFamily::Cn => &mut self.cn,
        };
        router.send(primitive)
    }
}
