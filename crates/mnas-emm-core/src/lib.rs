// EMM Service Access Point: primitive classification and sub-SAP dispatch
pub mod sap;

pub use sap::{classify, EmmSap, SubSapRouter};
