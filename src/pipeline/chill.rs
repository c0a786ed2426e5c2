use serde::{Deserialize, Serialize};

use crate::color::{Color, Hsl};

/// Saturation assigned to chilled colors.
pub const CHILL_SATURATION: f32 = 0.8;

/// Source saturation above which the chill transform replaces it.
pub const CHILL_SATURATION_THRESHOLD: f32 = 0.5;

/// Lightness every chilled color is pinned to.
pub const CHILL_LIGHTNESS: f32 = 0.97;

/// How the chill transform treats the source saturation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SaturationPolicy {
    /// Saturation above 0.5 becomes 0.8; anything else is kept.
    #[default]
    CappedHigh,
    /// Saturation is always 0.8.
    FixedHigh,
}

/// Derive the pastel companion of `hsl`: same hue, lightness 0.97, saturation
/// per `policy`.
pub fn chill(hsl: Hsl, policy: SaturationPolicy) -> Hsl {
    let s = match policy {
        SaturationPolicy::CappedHigh if hsl.s > CHILL_SATURATION_THRESHOLD => CHILL_SATURATION,
        SaturationPolicy::CappedHigh => hsl.s,
        SaturationPolicy::FixedHigh => CHILL_SATURATION,
    };
    Hsl::new(hsl.h, s, CHILL_LIGHTNESS)
}

/// HSL to hex, through sRGB.
pub fn hex_from_hsl(hsl: Hsl) -> String {
    Color::from_hsl(hsl).to_hex()
}
