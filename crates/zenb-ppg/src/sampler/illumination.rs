//! Torch / flash capability boundary.
//!
//! The camera collaborator owns the hardware. The core only asks whether
//! illumination exists and toggles it; a missing torch is a legal,
//! lower-contrast operating mode.

use crate::error::{PpgError, Result};

pub trait Illumination: Send {
    fn supports_illumination(&self) -> bool;

    fn set_illumination(&mut self, on: bool) -> Result<()>;
}

/// Device without a torch.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIllumination;

impl Illumination for NoIllumination {
    fn supports_illumination(&self) -> bool {
        false
    }

    fn set_illumination(&mut self, _on: bool) -> Result<()> {
        Err(PpgError::HardwareUnavailable("no torch on this device".to_string()))
    }
}

/// Turn the torch on if the device has one. Returns whether it is lit;
/// failures are logged and treated as "no boost available".
pub fn enable(torch: &mut dyn Illumination) -> bool {
    if !torch.supports_illumination() {
        log::info!("illumination not supported, sampling without torch");
        return false;
    }
    match torch.set_illumination(true) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("failed to enable illumination: {}", e);
            false
        }
    }
}

/// Turn the torch off; errors are logged only.
pub fn disable(torch: &mut dyn Illumination) {
    if !torch.supports_illumination() {
        return;
    }
    if let Err(e) = torch.set_illumination(false) {
        log::warn!("failed to disable illumination: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlakyTorch;

    impl Illumination for FlakyTorch {
        fn supports_illumination(&self) -> bool {
            true
        }

        fn set_illumination(&mut self, _on: bool) -> Result<()> {
            Err(PpgError::HardwareUnavailable("torch busy".to_string()))
        }
    }

    #[test]
    fn missing_torch_is_not_fatal() {
        assert!(!enable(&mut NoIllumination));
        disable(&mut NoIllumination);
    }

    #[test]
    fn failing_torch_degrades() {
        assert!(!enable(&mut FlakyTorch));
        disable(&mut FlakyTorch);
    }
}
