use anyhow::Result;

use crate::detect::geometry::PanelBox;

/// Detection capabilities a backend may implement.
///
/// The simulated backend covers all three; real inference adapters typically
/// start with presence only and grow from there.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectionCapability {
    Presence,
    Quantification,
    Localization,
}

/// Input handed to a backend: claim coordinates plus an optional
/// already-resolved image.
///
/// Backends must not fetch anything themselves; imagery resolution and its
/// failures belong to the calling workflow.
#[derive(Clone, Copy, Debug)]
pub struct SampleInput<'a> {
    pub sample_id: &'a str,
    pub lat: f64,
    pub lon: f64,
    pub image: Option<&'a [u8]>,
}

/// Presence classifier output: the solar-presence flag and the raw
/// (unrounded) confidence backing it.
#[derive(Clone, Copy, Debug)]
pub struct PresenceEstimate {
    pub has_solar: bool,
    pub confidence: f64,
}

/// Detection backend trait.
///
/// The engine drives the pipeline; backends answer three questions about one
/// sample. A backend that does not support a capability returns an error from
/// the corresponding method and reports it via `supports`, and the engine
/// surfaces that as a detection-unavailable failure.
pub trait DetectionBackend: Send {
    /// Backend identifier used for registry lookup.
    fn name(&self) -> &'static str;

    /// Returns true when the backend supports a capability.
    fn supports(&self, capability: DetectionCapability) -> bool;

    /// Estimate whether panels are present and how confident that call is.
    fn presence(&mut self, input: &SampleInput<'_>) -> Result<PresenceEstimate>;

    /// Estimate the number of discrete panel units. Called only after a
    /// positive presence estimate.
    fn quantify(&mut self, input: &SampleInput<'_>, estimate: &PresenceEstimate) -> Result<u32>;

    /// Produce one box per estimated panel, in the reference frame.
    fn localize(&mut self, input: &SampleInput<'_>, panel_count: u32) -> Result<Vec<PanelBox>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
