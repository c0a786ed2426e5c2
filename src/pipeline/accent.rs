use serde::Serialize;

use crate::color::Hsl;
use crate::pipeline::chill::{chill, hex_from_hsl, SaturationPolicy};
use crate::pipeline::swatch::{Swatch, SwatchSet};

/// A display color: hex string plus the HSL it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Accent {
    pub hex: String,
    pub hsl: Hsl,
}

/// The two accents computed per pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Accents {
    /// The primary swatch, verbatim.
    pub default: Accent,
    /// The chilled companion of the primary swatch.
    pub chilled: Accent,
}

impl Accents {
    pub fn from_swatch(primary: &Swatch, policy: SaturationPolicy) -> Self {
        let chilled_hsl = chill(primary.hsl, policy);
        Self {
            default: Accent {
                hex: primary.hex(),
                hsl: primary.hsl,
            },
            chilled: Accent {
                hex: hex_from_hsl(chilled_hsl),
                hsl: chilled_hsl,
            },
        }
    }
}

/// Pick the primary swatch and derive both accents from it.
///
/// Returns `None` for an empty swatch set.
pub fn derive_accents(swatches: &SwatchSet, policy: SaturationPolicy) -> Option<Accents> {
    swatches
        .primary()
        .map(|primary| Accents::from_swatch(primary, policy))
}
