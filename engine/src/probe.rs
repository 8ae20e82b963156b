//! Multimodal capability probe.
//!
//! The node must fail before construction, with remediation instructions,
//! when the backend library was built without the MMVQ multimodal kernels.
//! Detection is by symbol presence: only MMVQ builds export the multimodal
//! loader entry point.

use std::sync::Mutex;

use libloading::Library;
use once_cell::sync::Lazy;

use crate::error::{EngineError, Result};

/// Symbol exported only by MMVQ-enabled builds of the backend library.
pub const VISION_LOAD_SYMBOL: &[u8] = b"vlm_model_load_mm\0";

pub const MMVQ_INSTALL_HINT: &str =
    "Rebuild llama.cpp from source with MMVQ enabled:\n\
     cmake -B build -DLLAMA_BUILD_TESTS=OFF -DLLAMA_BUILD_MMVQ=ON && \
     cmake --build build --config Release\n\
     then point the node at the rebuilt shared library.";

/// Whether the loaded library already passed the vision probe.
///
/// Process-wide and unkeyed: the node loads exactly one backend library per
/// process. Only success is memoized; a failed probe re-runs on the next
/// call, so a rebuilt library is picked up without restarting the host.
static VISION_VERIFIED: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(false));

/// Verify the library exports the multimodal loader, memoizing success.
pub fn ensure_vision_support(library: &Library) -> Result<()> {
    ensure_vision_support_with(|symbol| has_symbol(library, symbol))
}

pub(crate) fn ensure_vision_support_with(lookup: impl Fn(&[u8]) -> bool) -> Result<()> {
    let mut verified = VISION_VERIFIED.lock().expect("vision probe mutex poisoned");
    if *verified {
        return Ok(());
    }

    if !lookup(VISION_LOAD_SYMBOL) {
        return Err(EngineError::MissingVisionSupport(format!(
            "The backend library was compiled without multimodal/MMVQ support. {}",
            MMVQ_INSTALL_HINT
        )));
    }

    log::debug!("Multimodal loader symbol resolved; caching probe result");
    *verified = true;
    Ok(())
}

/// Forget a previous successful probe.
pub fn reset_vision_probe() {
    *VISION_VERIFIED.lock().expect("vision probe mutex poisoned") = false;
}

fn has_symbol(library: &Library, symbol: &[u8]) -> bool {
    unsafe { library.get::<*const ()>(symbol).is_ok() }
}
