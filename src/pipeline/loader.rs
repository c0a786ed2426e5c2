use std::path::Path;
use std::time::Duration;

use image::DynamicImage;

use crate::error::PipelineError;

/// The image the pipeline falls back to whenever no usable address is given.
pub const DEFAULT_IMAGE: &str = "https://picsum.photos/500/500";

const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Turns an image address into decoded pixels.
pub trait ImageLoader {
    fn load(&self, address: &str) -> Result<DynamicImage, PipelineError>;
}

/// Loads `http(s)://` URLs over the network and anything else from disk.
pub struct DefaultImageLoader {
    client: reqwest::blocking::Client,
}

impl DefaultImageLoader {
    pub fn new() -> Result<Self, PipelineError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(concat!("colorchill/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipelineError::decode("<client>", e))?;
        Ok(Self { client })
    }

    fn fetch(&self, url: &str) -> Result<DynamicImage, PipelineError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| PipelineError::decode(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::decode(url, format!("HTTP {status}")));
        }
        let bytes = response.bytes().map_err(|e| PipelineError::decode(url, e))?;
        image::load_from_memory(&bytes).map_err(|e| PipelineError::decode(url, e))
    }
}

impl ImageLoader for DefaultImageLoader {
    fn load(&self, address: &str) -> Result<DynamicImage, PipelineError> {
        if is_remote(address) {
            return self.fetch(address);
        }
        open_local(Path::new(address))
    }
}

/// Whether `address` should be fetched over the network.
pub fn is_remote(address: &str) -> bool {
    let lower = address.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn open_local(path: &Path) -> Result<DynamicImage, PipelineError> {
    let address = path.display().to_string();
    if !path.exists() {
        return Err(PipelineError::decode(address, "file not found"));
    }
    image::open(path).map_err(|e| {
        PipelineError::decode(
            address,
            format!("unsupported or corrupt image ({e}). Supported formats: PNG, JPEG, WebP, BMP, TIFF, GIF"),
        )
    })
}
