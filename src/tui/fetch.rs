use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use image::DynamicImage;
use tracing::debug;

use crate::error::PipelineError;
use crate::pipeline::{ImageLoader, LoadRequest, RequestToken};

/// A finished load, tagged with the request it answers.
pub type LoadOutcome = (RequestToken, Result<DynamicImage, PipelineError>);

/// Runs image loads on background threads and hands outcomes back in
/// completion order.
pub struct Fetcher<L> {
    loader: Arc<L>,
    tx: Sender<LoadOutcome>,
    rx: Receiver<LoadOutcome>,
}

impl<L: ImageLoader + Send + Sync + 'static> Fetcher<L> {
    pub fn new(loader: Arc<L>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self { loader, tx, rx }
    }

    pub fn spawn(&self, request: LoadRequest) {
        debug!(token = ?request.token, address = %request.address, "loading image in background");
        let loader = Arc::clone(&self.loader);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let outcome = loader.load(&request.address);
            // The receiver is gone once the UI has quit.
            let _ = tx.send((request.token, outcome));
        });
    }

    /// Next finished load, if one is ready.
    pub fn try_next(&self) -> Option<LoadOutcome> {
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next finished load.
    pub fn next_timeout(&self, timeout: Duration) -> Option<LoadOutcome> {
        self.rx.recv_timeout(timeout).ok()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Condvar, Mutex};

    use super::*;
    use crate::color::Color;
    use crate::pipeline::{
        ExtractOptions, Orchestrator, Phase, PipelineConfig, Swatch, SwatchSet, SwatchSource,
    };
    use crate::storage::MemoryStore;

    /// Loads instantly, except "slow.png", which waits until released.
    #[derive(Default)]
    struct GatedLoader {
        released: Mutex<bool>,
        gate: Condvar,
    }

    impl GatedLoader {
        fn release(&self) {
            *self.released.lock().unwrap() = true;
            self.gate.notify_all();
        }
    }

    impl ImageLoader for GatedLoader {
        fn load(&self, address: &str) -> Result<DynamicImage, PipelineError> {
            if address == "slow.png" {
                let mut released = self.released.lock().unwrap();
                while !*released {
                    released = self.gate.wait(released).unwrap();
                }
            }
            Ok(DynamicImage::ImageRgb8(image::RgbImage::new(2, 2)))
        }
    }

    struct OneSwatch;

    impl SwatchSource for OneSwatch {
        fn extract(
            &self,
            _image: &DynamicImage,
            _options: &ExtractOptions,
        ) -> Result<SwatchSet, PipelineError> {
            Ok([Swatch::new("Vibrant", Color::new(51, 102, 204), 10)]
                .into_iter()
                .collect())
        }
    }

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn blocked_load_does_not_hold_up_later_requests() {
        let loader = Arc::new(GatedLoader::default());
        let fetcher = Fetcher::new(Arc::clone(&loader));
        let mut orch = Orchestrator::new(PipelineConfig::default(), OneSwatch, MemoryStore::new());

        let slow = orch.submit_image(Some("slow.png"));
        fetcher.spawn(slow.clone());
        let fast = orch.submit_image(Some("fast.png"));
        fetcher.spawn(fast.clone());

        let (token, outcome) = fetcher.next_timeout(WAIT).unwrap();
        assert_eq!(token, fast.token);
        orch.on_image_loaded(token, outcome);
        assert_eq!(orch.phase(), Phase::Ready);
        assert_eq!(orch.history().len(), 1);

        loader.release();
        let (token, outcome) = fetcher.next_timeout(WAIT).unwrap();
        assert_eq!(token, slow.token);
        orch.on_image_loaded(token, outcome);
        assert_eq!(orch.state().image_address, "fast.png");
        assert_eq!(orch.history().len(), 1);
        assert!(fetcher.try_next().is_none());
    }

    #[test]
    fn nothing_ready_yields_none() {
        let fetcher = Fetcher::new(Arc::new(GatedLoader::default()));
        assert!(fetcher.try_next().is_none());
    }
}
