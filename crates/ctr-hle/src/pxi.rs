//! The `pxi:dev` service. Registered so guests can connect; no command is
//! emulated.

use crate::framework::{FunctionInfo, ServiceFramework};

#[derive(Debug, Default)]
pub struct PxiDev;

impl PxiDev {
    /// Create the service.
    pub fn new() -> Self {
        Self
    }
}

impl ServiceFramework for PxiDev {
    const NAME: &'static str = "pxi:dev";
    const MAX_SESSIONS: u32 = 1;

    fn functions() -> &'static [FunctionInfo<Self>] {
        &[]
    }
}
