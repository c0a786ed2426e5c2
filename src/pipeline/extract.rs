use std::collections::HashSet;

use image::imageops::FilterType;
use image::DynamicImage;
use kmeans_colors::get_kmeans_hamerly;
use palette::{IntoColor, Lab, Srgb};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::color::{Color, Hsl};
use crate::error::PipelineError;
use crate::pipeline::swatch::{Swatch, SwatchRole, SwatchSet};

/// A color extracted from the image with its cluster weight.
#[derive(Debug, Clone)]
pub struct ExtractedColor {
    pub color: Color,
    pub weight: f32,
    pub population: u32,
}

pub const DEFAULT_MAX_DIMENSION: u32 = 256;
pub const DEFAULT_MAX_COLOR_COUNT: usize = 64;
/// Cluster indices are stored as bytes by the k-means engine.
pub const MAX_COLOR_COUNT_LIMIT: usize = 256;

const MAX_ITER: usize = 20;
const CONVERGE: f32 = 5.0;
const DEDUP_THRESHOLD: f32 = 25.0; // ΔE² < 25 means ΔE < 5
const MIN_ALPHA: u8 = 125;
const SEED: u64 = 42;

/// Tuning knobs for a single extraction.
///
/// `None` means "use the engine default".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractOptions {
    /// Longest side sampled before quantization. Lower is faster, less accurate.
    pub max_dimension: Option<u32>,
    /// Upper bound on quantization buckets. Higher is finer-grained, slower.
    pub max_color_count: Option<usize>,
}

impl ExtractOptions {
    /// Resolve defaults and reject zero or out-of-range values.
    pub fn resolve(&self) -> Result<(u32, usize), PipelineError> {
        let max_dimension = self.max_dimension.unwrap_or(DEFAULT_MAX_DIMENSION);
        let max_color_count = self.max_color_count.unwrap_or(DEFAULT_MAX_COLOR_COUNT);
        if max_dimension == 0 {
            return Err(PipelineError::InvalidOptions(
                "max dimension must be positive".to_string(),
            ));
        }
        if max_color_count == 0 || max_color_count > MAX_COLOR_COUNT_LIMIT {
            return Err(PipelineError::InvalidOptions(format!(
                "max color count must be between 1 and {MAX_COLOR_COUNT_LIMIT}, got {max_color_count}"
            )));
        }
        Ok((max_dimension, max_color_count))
    }
}

/// The seam to a color-quantization engine: decoded image in, named swatches out.
pub trait SwatchSource {
    fn extract(
        &self,
        image: &DynamicImage,
        options: &ExtractOptions,
    ) -> Result<SwatchSet, PipelineError>;
}

/// Swatch engine built on K-means clustering in CIELAB plus role scoring.
#[derive(Debug, Clone, Copy, Default)]
pub struct KmeansSwatchSource;

impl SwatchSource for KmeansSwatchSource {
    fn extract(
        &self,
        image: &DynamicImage,
        options: &ExtractOptions,
    ) -> Result<SwatchSet, PipelineError> {
        let (max_dimension, max_color_count) = options.resolve()?;
        let pixels = prepare_pixels(image, max_dimension);
        if pixels.is_empty() {
            return Err(PipelineError::Extraction(
                "image has no opaque pixels".to_string(),
            ));
        }
        debug!(
            pixels = pixels.len(),
            max_dimension, max_color_count, "quantizing image"
        );
        let colors = extract_colors(&pixels, max_color_count);
        Ok(assign_roles(&colors))
    }
}

/// Resize to fit within `max_dimension` (preserving aspect ratio), drop
/// mostly-transparent pixels, and convert the rest to CIELAB.
pub fn prepare_pixels(img: &DynamicImage, max_dimension: u32) -> Vec<Lab> {
    let resized;
    let img = if img.width() > max_dimension || img.height() > max_dimension {
        resized = img.resize(max_dimension, max_dimension, FilterType::Lanczos3);
        &resized
    } else {
        img
    };
    let rgba_img = img.to_rgba8();

    rgba_img
        .pixels()
        .filter(|p| p[3] >= MIN_ALPHA)
        .map(|p| {
            let srgb: Srgb<f32> = Srgb::new(p[0], p[1], p[2]).into_format();
            srgb.into_color()
        })
        .collect()
}

/// Run K-means on LAB pixels to extract dominant colors.
///
/// Returns deduplicated colors sorted by weight (descending).
/// Uses Hamerly's algorithm with K-means++ initialization. `k` is capped at
/// the number of distinct pixels so seeding never runs out of candidates.
pub fn extract_colors(pixels: &[Lab], k: usize) -> Vec<ExtractedColor> {
    if pixels.is_empty() {
        return Vec::new();
    }
    let distinct: HashSet<[u32; 3]> = pixels
        .iter()
        .map(|p| [p.l.to_bits(), p.a.to_bits(), p.b.to_bits()])
        .collect();
    let k = k.clamp(1, MAX_COLOR_COUNT_LIMIT).min(distinct.len());

    let result = get_kmeans_hamerly(k, MAX_ITER, CONVERGE, false, pixels, SEED);

    let total = pixels.len() as f32;

    // Count pixels per centroid to compute weights
    let mut counts = vec![0u32; k];
    for &idx in &result.indices {
        counts[idx as usize] += 1;
    }

    let mut colors: Vec<ExtractedColor> = result
        .centroids
        .iter()
        .enumerate()
        .filter(|(i, _)| counts[*i] > 0)
        .map(|(i, lab)| ExtractedColor {
            color: Color::from_lab(*lab),
            weight: counts[i] as f32 / total,
            population: counts[i],
        })
        .collect();

    deduplicate(&mut colors);

    colors.sort_by(|a, b| b.weight.total_cmp(&a.weight));

    colors
}

/// Merge colors that are too similar (ΔE < 5 in LAB space).
/// Keeps the first color and accumulates the weight.
fn deduplicate(colors: &mut Vec<ExtractedColor>) {
    let mut i = 0;
    while i < colors.len() {
        let mut j = i + 1;
        while j < colors.len() {
            let lab_i = colors[i].color.to_lab();
            let lab_j = colors[j].color.to_lab();
            let delta_e_sq = (lab_i.l - lab_j.l).powi(2)
                + (lab_i.a - lab_j.a).powi(2)
                + (lab_i.b - lab_j.b).powi(2);
            if delta_e_sq < DEDUP_THRESHOLD {
                colors[i].weight += colors[j].weight;
                colors[i].population += colors[j].population;
                colors.remove(j);
            } else {
                j += 1;
            }
        }
        i += 1;
    }
}

/// Acceptance window and target for one swatch role.
struct RoleTarget {
    role: SwatchRole,
    luma: (f32, f32, f32),
    saturation: (f32, f32, f32),
}

const TARGET_DARK_LUMA: f32 = 0.26;
const TARGET_NORMAL_LUMA: f32 = 0.5;

const ROLE_TARGETS: [RoleTarget; 6] = [
    RoleTarget {
        role: SwatchRole::Vibrant,
        luma: (0.3, TARGET_NORMAL_LUMA, 0.7),
        saturation: (0.35, 1.0, 1.0),
    },
    RoleTarget {
        role: SwatchRole::LightVibrant,
        luma: (0.55, 0.74, 1.0),
        saturation: (0.35, 1.0, 1.0),
    },
    RoleTarget {
        role: SwatchRole::DarkVibrant,
        luma: (0.0, TARGET_DARK_LUMA, 0.45),
        saturation: (0.35, 1.0, 1.0),
    },
    RoleTarget {
        role: SwatchRole::Muted,
        luma: (0.3, TARGET_NORMAL_LUMA, 0.7),
        saturation: (0.0, 0.3, 0.4),
    },
    RoleTarget {
        role: SwatchRole::LightMuted,
        luma: (0.55, 0.74, 1.0),
        saturation: (0.0, 0.3, 0.4),
    },
    RoleTarget {
        role: SwatchRole::DarkMuted,
        luma: (0.0, TARGET_DARK_LUMA, 0.45),
        saturation: (0.0, 0.3, 0.4),
    },
];

const WEIGHT_SATURATION: f32 = 3.0;
const WEIGHT_LUMA: f32 = 6.5;
const WEIGHT_POPULATION: f32 = 0.5;

impl RoleTarget {
    fn accepts(&self, hsl: Hsl) -> bool {
        let (min_l, _, max_l) = self.luma;
        let (min_s, _, max_s) = self.saturation;
        (min_l..=max_l).contains(&hsl.l) && (min_s..=max_s).contains(&hsl.s)
    }

    fn score(&self, hsl: Hsl, population: u32, max_population: u32) -> f32 {
        let closeness = |value: f32, target: f32| 1.0 - (value - target).abs();
        let population_share = if max_population > 0 {
            population as f32 / max_population as f32
        } else {
            0.0
        };
        let weighted = closeness(hsl.s, self.saturation.1) * WEIGHT_SATURATION
            + closeness(hsl.l, self.luma.1) * WEIGHT_LUMA
            + population_share * WEIGHT_POPULATION;
        weighted / (WEIGHT_SATURATION + WEIGHT_LUMA + WEIGHT_POPULATION)
    }
}

/// Tag extracted colors with perceptual roles.
///
/// Each role takes the best-scoring unused color inside its window. A missing
/// Vibrant or DarkVibrant is synthesized from the other one when possible.
pub fn assign_roles(colors: &[ExtractedColor]) -> SwatchSet {
    let max_population = colors.iter().map(|c| c.population).max().unwrap_or(0);
    let hsls: Vec<Hsl> = colors.iter().map(|c| c.color.to_hsl()).collect();
    let mut used = vec![false; colors.len()];
    let mut picked: [Option<Swatch>; 6] = Default::default();

    for (slot, target) in ROLE_TARGETS.iter().enumerate() {
        let best = colors
            .iter()
            .enumerate()
            .filter(|(i, _)| !used[*i] && target.accepts(hsls[*i]))
            .map(|(i, c)| (i, target.score(hsls[i], c.population, max_population)))
            .max_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((i, _)) = best {
            used[i] = true;
            picked[slot] = Some(Swatch::with_hsl(
                target.role.as_str(),
                colors[i].color,
                hsls[i],
                colors[i].population,
            ));
        }
    }

    fill_missing(&mut picked);

    picked.into_iter().flatten().collect()
}

fn fill_missing(picked: &mut [Option<Swatch>; 6]) {
    let vibrant = role_slot(SwatchRole::Vibrant);
    let dark_vibrant = role_slot(SwatchRole::DarkVibrant);

    if picked[vibrant].is_none() {
        if let Some(source) = &picked[dark_vibrant] {
            picked[vibrant] = Some(relit(source, SwatchRole::Vibrant, TARGET_NORMAL_LUMA));
        }
    }
    if picked[dark_vibrant].is_none() {
        if let Some(source) = &picked[vibrant] {
            picked[dark_vibrant] = Some(relit(source, SwatchRole::DarkVibrant, TARGET_DARK_LUMA));
        }
    }
}

fn role_slot(role: SwatchRole) -> usize {
    ROLE_TARGETS
        .iter()
        .position(|t| t.role == role)
        .unwrap_or_default()
}

/// Copy `source`'s hue and saturation at a new lightness.
fn relit(source: &Swatch, role: SwatchRole, lightness: f32) -> Swatch {
    let hsl = Hsl::new(source.hsl.h, source.hsl.s, lightness);
    Swatch::with_hsl(role.as_str(), Color::from_hsl(hsl), hsl, 0)
}
