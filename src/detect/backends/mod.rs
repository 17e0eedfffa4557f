mod simulated;
#[cfg(feature = "backend-tract")]
mod tract;

pub use simulated::{SimulatedBackend, SimulationProfile};
#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;
