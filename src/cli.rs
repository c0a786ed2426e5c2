use std::path::PathBuf;

use clap::Parser;

use crate::pipeline::{ExtractOptions, PipelineConfig, SaturationPolicy, DEFAULT_IMAGE};

/// Extract accent colors from an image and derive a chilled pastel companion.
#[derive(Parser, Debug)]
#[command(name = "colorchill", version, about)]
pub struct Args {
    /// Image URL or local path (defaults to the default image)
    pub image: Option<String>,

    /// Image used when none is given or the given one fails to load
    #[arg(long, default_value = DEFAULT_IMAGE)]
    pub default_image: String,

    /// Longest side sampled before quantization
    #[arg(long)]
    pub max_dimension: Option<u32>,

    /// Upper bound on quantization buckets (1-256)
    #[arg(short = 'k', long = "max-colors")]
    pub max_colors: Option<usize>,

    /// How the chill transform treats the source saturation
    #[arg(long, value_enum, default_value_t = SaturationPolicy::CappedHigh)]
    pub saturation_policy: SaturationPolicy,

    /// Where chill history is persisted (defaults to the user data directory)
    #[arg(long)]
    pub history_file: Option<PathBuf>,

    /// Keep at most this many history entries, dropping the oldest
    #[arg(long)]
    pub history_limit: Option<usize>,

    /// Do not read or write persisted history
    #[arg(long, conflicts_with = "history_file")]
    pub no_history: bool,

    /// Print the pipeline state as JSON
    #[arg(long, conflicts_with_all = ["preview", "tui"])]
    pub json: bool,

    /// Print a colored terminal preview of the accents and swatches
    #[arg(long)]
    pub preview: bool,

    /// Launch interactive TUI mode
    #[arg(long, conflicts_with = "preview")]
    pub tui: bool,
}

impl Args {
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            default_image: self.default_image.clone(),
            extract: ExtractOptions {
                max_dimension: self.max_dimension,
                max_color_count: self.max_colors,
            },
            saturation_policy: self.saturation_policy,
            history_limit: self.history_limit,
        }
    }
}
