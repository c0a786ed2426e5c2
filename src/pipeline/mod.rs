//! Image to accents: swatch extraction, accent derivation and the
//! orchestrator that ties them to history and published state.

pub mod accent;
pub mod chill;
pub mod extract;
pub mod loader;
pub mod orchestrator;
pub mod swatch;

pub use accent::{derive_accents, Accent, Accents};
pub use chill::{chill, hex_from_hsl, SaturationPolicy};
pub use extract::{ExtractOptions, KmeansSwatchSource, SwatchSource};
pub use loader::{DefaultImageLoader, ImageLoader, DEFAULT_IMAGE};
pub use orchestrator::{
    LoadRequest, Notification, Orchestrator, Phase, PipelineConfig, PipelineState, RequestToken,
};
pub use swatch::{Swatch, SwatchRole, SwatchSet};
