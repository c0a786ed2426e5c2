use image::DynamicImage;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::history::PaletteHistory;
use crate::pipeline::accent::{derive_accents, Accent};
use crate::pipeline::chill::SaturationPolicy;
use crate::pipeline::extract::{ExtractOptions, SwatchSource};
use crate::pipeline::loader::{ImageLoader, DEFAULT_IMAGE};
use crate::pipeline::swatch::{Swatch, SwatchSet};
use crate::storage::KeyValueStore;

/// Everything tunable about a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineConfig {
    pub default_image: String,
    pub extract: ExtractOptions,
    pub saturation_policy: SaturationPolicy,
    /// Maximum history length; `None` keeps every entry.
    pub history_limit: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_image: DEFAULT_IMAGE.to_string(),
            extract: ExtractOptions::default(),
            saturation_policy: SaturationPolicy::default(),
            history_limit: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

/// Identifies one submission. Only results for the latest token are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

/// An image the host should decode, and the token to report back with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub token: RequestToken,
    pub address: String,
}

/// Messages meant for the user rather than the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    InvalidImageUrl,
}

impl Notification {
    pub fn message(self) -> &'static str {
        match self {
            Notification::InvalidImageUrl => "URL is not valid image",
        }
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// The published view of the pipeline. Readers get copies.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineState {
    pub phase: Phase,
    pub image_address: String,
    pub primary_swatch: Option<Swatch>,
    pub accent_default: Option<Accent>,
    pub accent_chilled: Option<Accent>,
    pub swatch_set: Option<SwatchSet>,
    pub history: Vec<String>,
    pub last_error: Option<String>,
}

impl PipelineState {
    fn clear_palette(&mut self) {
        self.primary_swatch = None;
        self.accent_default = None;
        self.accent_chilled = None;
        self.swatch_set = None;
    }
}

type Subscriber = Box<dyn FnMut(&PipelineState)>;

/// Drives a single image slot from address to published accents.
///
/// The host decodes images and reports back through
/// [`Orchestrator::on_image_decoded`] / [`Orchestrator::on_image_decode_failed`],
/// or hands an [`ImageLoader`] to [`Orchestrator::run`] to do it inline.
pub struct Orchestrator<Src, St> {
    config: PipelineConfig,
    source: Src,
    history: PaletteHistory<St>,
    state: PipelineState,
    query: String,
    issued: u64,
    notifications: Vec<Notification>,
    subscribers: Vec<Subscriber>,
}

impl<Src: SwatchSource, St: KeyValueStore> Orchestrator<Src, St> {
    pub fn new(config: PipelineConfig, source: Src, store: St) -> Self {
        let mut history = PaletteHistory::with_limit(store, config.history_limit);
        let mut state = PipelineState {
            image_address: config.default_image.clone(),
            ..PipelineState::default()
        };
        match history.load() {
            Ok(entries) => state.history = entries.to_vec(),
            Err(e) => {
                warn!(error = %e, "could not read chill history");
                state.last_error = Some(e.to_string());
            }
        }

        Self {
            config,
            source,
            history,
            state,
            query: String::new(),
            issued: 0,
            notifications: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    /// Kick off the first cycle against the default image.
    pub fn start(&mut self) -> LoadRequest {
        self.issue()
    }

    /// Point the slot at `address`. An empty or missing address re-issues the
    /// default image.
    pub fn submit_image(&mut self, address: Option<&str>) -> LoadRequest {
        match address.map(str::trim).filter(|a| !a.is_empty()) {
            Some(address) => self.state.image_address = address.to_string(),
            None => self.state.image_address = self.config.default_image.clone(),
        }
        self.issue()
    }

    /// Submit whatever is currently in the query input.
    pub fn submit_query(&mut self) -> LoadRequest {
        let query = self.query.clone();
        self.submit_image(Some(&query))
    }

    /// Extract swatches from a decoded image and apply them.
    ///
    /// Returns `false` when the token is stale and nothing was applied.
    pub fn on_image_decoded(&mut self, token: RequestToken, image: &DynamicImage) -> bool {
        if !self.is_current(token) {
            debug!(?token, "skipping extraction for superseded image");
            return false;
        }
        let result = self.source.extract(image, &self.config.extract);
        self.apply_extraction(token, result)
    }

    /// Apply an extraction result computed for `token`.
    ///
    /// Results for anything but the latest submission are discarded.
    pub fn apply_extraction(
        &mut self,
        token: RequestToken,
        result: Result<SwatchSet, PipelineError>,
    ) -> bool {
        if !self.is_current(token) {
            debug!(?token, latest = self.issued, "discarding stale extraction result");
            return false;
        }

        match result {
            Ok(swatches) => self.apply_swatches(swatches),
            Err(e) => {
                warn!(address = %self.state.image_address, error = %e, "extraction failed");
                self.state.clear_palette();
                self.state.last_error = Some(e.to_string());
                self.state.phase = Phase::Error;
            }
        }
        self.publish();
        true
    }

    fn apply_swatches(&mut self, swatches: SwatchSet) {
        self.state.last_error = None;
        match derive_accents(&swatches, self.config.saturation_policy) {
            Some(accents) => {
                info!(
                    address = %self.state.image_address,
                    default = %accents.default.hex,
                    chilled = %accents.chilled.hex,
                    swatches = swatches.len(),
                    "accents derived"
                );
                if let Err(e) = self.history.append(&accents.chilled.hex) {
                    warn!(error = %e, "could not persist chill history");
                    self.state.last_error = Some(e.to_string());
                }
                self.state.history = self.history.entries().to_vec();
                self.state.primary_swatch = swatches.primary().cloned();
                self.state.accent_default = Some(accents.default);
                self.state.accent_chilled = Some(accents.chilled);
            }
            None => {
                warn!(address = %self.state.image_address, "no swatches found");
                self.state.primary_swatch = None;
                self.state.accent_default = None;
                self.state.accent_chilled = None;
            }
        }
        self.state.swatch_set = Some(swatches);
        self.state.phase = Phase::Ready;
    }

    /// Handle an address that could not be loaded as an image.
    ///
    /// Notifies the user, reverts to the default image and clears the query.
    /// Returns the retry request for the default image, or `None` when the
    /// default image itself was the one that failed.
    pub fn on_image_decode_failed(
        &mut self,
        token: RequestToken,
        error: &PipelineError,
    ) -> Option<LoadRequest> {
        if !self.is_current(token) {
            debug!(?token, "ignoring decode failure for superseded image");
            return None;
        }
        warn!(error = %error, "image failed to load");

        let failed = std::mem::replace(
            &mut self.state.image_address,
            self.config.default_image.clone(),
        );
        self.notifications.push(Notification::InvalidImageUrl);
        self.query.clear();
        self.state.clear_palette();
        self.state.last_error = Some(error.to_string());
        self.state.phase = Phase::Error;
        self.publish();

        if failed == self.config.default_image {
            None
        } else {
            Some(self.issue())
        }
    }

    /// Feed back the outcome of loading the image for `token`.
    ///
    /// Returns the follow-up request, if any.
    pub fn on_image_loaded(
        &mut self,
        token: RequestToken,
        outcome: Result<DynamicImage, PipelineError>,
    ) -> Option<LoadRequest> {
        match outcome {
            Ok(image) => {
                self.on_image_decoded(token, &image);
                None
            }
            Err(e) => self.on_image_decode_failed(token, &e),
        }
    }

    /// Decode `request` with `loader` on this thread and feed the outcome back in.
    pub fn load_with<L: ImageLoader + ?Sized>(
        &mut self,
        loader: &L,
        request: LoadRequest,
    ) -> Option<LoadRequest> {
        let outcome = loader.load(&request.address);
        self.on_image_loaded(request.token, outcome)
    }

    /// Run `request` and every retry it triggers to completion.
    pub fn run<L: ImageLoader + ?Sized>(
        &mut self,
        loader: &L,
        request: LoadRequest,
    ) -> &PipelineState {
        let mut next = Some(request);
        while let Some(request) = next {
            next = self.load_with(loader, request);
        }
        &self.state
    }

    /// Register a read-only observer, called after every state change.
    pub fn subscribe(&mut self, subscriber: impl FnMut(&PipelineState) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn snapshot(&self) -> PipelineState {
        self.state.clone()
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Drain notifications queued since the last call.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn history(&self) -> &[String] {
        self.history.entries()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.issued
    }

    fn issue(&mut self) -> LoadRequest {
        self.issued += 1;
        self.state.phase = Phase::Loading;
        self.publish();
        LoadRequest {
            token: RequestToken(self.issued),
            address: self.state.image_address.clone(),
        }
    }

    fn publish(&mut self) {
        for subscriber in &mut self.subscribers {
            subscriber(&self.state);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use super::*;
    use crate::color::{Color, Hsl};
    use crate::history::HISTORY_KEY;
    use crate::storage::MemoryStore;

    /// Hands back the same swatch set for every image, or an extraction error.
    struct FixedSource(Option<SwatchSet>);

    impl SwatchSource for FixedSource {
        fn extract(
            &self,
            _image: &DynamicImage,
            _options: &ExtractOptions,
        ) -> Result<SwatchSet, PipelineError> {
            self.0
                .clone()
                .ok_or_else(|| PipelineError::Extraction("engine exploded".to_string()))
        }
    }

    /// Resolves known addresses to a tiny image; everything else fails.
    struct MapLoader {
        known: HashMap<String, DynamicImage>,
        calls: RefCell<Vec<String>>,
    }

    impl MapLoader {
        fn with(addresses: &[&str]) -> Self {
            let img = DynamicImage::ImageRgb8(image::RgbImage::new(2, 2));
            Self {
                known: addresses
                    .iter()
                    .map(|a| (a.to_string(), img.clone()))
                    .collect(),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl ImageLoader for MapLoader {
        fn load(&self, address: &str) -> Result<DynamicImage, PipelineError> {
            self.calls.borrow_mut().push(address.to_string());
            self.known
                .get(address)
                .cloned()
                .ok_or_else(|| PipelineError::decode(address, "404"))
        }
    }

    const DEFAULT: &str = "default.png";

    fn vibrant_set() -> SwatchSet {
        [Swatch::with_hsl(
            "Vibrant",
            Color::from_hex("#3366CC").unwrap(),
            Hsl::new(0.6, 0.7, 0.45),
            100,
        )]
        .into_iter()
        .collect()
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            default_image: DEFAULT.to_string(),
            ..PipelineConfig::default()
        }
    }

    fn orchestrator(set: Option<SwatchSet>) -> Orchestrator<FixedSource, MemoryStore> {
        Orchestrator::new(config(), FixedSource(set), MemoryStore::new())
    }

    #[test]
    fn starts_idle_on_default_image() {
        let orch = orchestrator(Some(vibrant_set()));
        assert_eq!(orch.phase(), Phase::Idle);
        assert_eq!(orch.state().image_address, DEFAULT);
        assert!(orch.state().history.is_empty());
    }

    #[test]
    fn successful_cycle_publishes_accents() {
        let mut orch = orchestrator(Some(vibrant_set()));
        let loader = MapLoader::with(&[DEFAULT]);
        let request = orch.start();
        let state = orch.run(&loader, request);

        assert_eq!(state.phase, Phase::Ready);
        let default = state.accent_default.as_ref().unwrap();
        assert_eq!(default.hex, "#3366cc");
        assert_eq!(default.hsl, Hsl::new(0.6, 0.7, 0.45));
        let chilled = state.accent_chilled.as_ref().unwrap();
        assert_eq!(chilled.hsl, Hsl::new(0.6, 0.8, 0.97));
        assert_eq!(state.history, vec![chilled.hex.clone()]);
        assert_eq!(state.primary_swatch.as_ref().unwrap().name, "Vibrant");
        assert_eq!(state.swatch_set.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn empty_submission_reissues_default() {
        let mut orch = orchestrator(Some(vibrant_set()));
        orch.submit_image(Some("https://example.com/cat.png"));
        let request = orch.submit_image(Some("   "));
        assert_eq!(request.address, DEFAULT);
        let request = orch.submit_image(None);
        assert_eq!(request.address, DEFAULT);
    }

    #[test]
    fn decode_failure_notifies_once_and_reverts() {
        let mut orch = orchestrator(Some(vibrant_set()));
        let loader = MapLoader::with(&[DEFAULT]);
        orch.set_query("https://example.com/broken");
        let request = orch.submit_query();
        orch.run(&loader, request);

        assert_eq!(orch.take_notifications(), vec![Notification::InvalidImageUrl]);
        assert!(orch.take_notifications().is_empty());
        assert_eq!(orch.query(), "");
        assert_eq!(orch.state().image_address, DEFAULT);
        assert_eq!(orch.phase(), Phase::Ready);
        assert_eq!(
            *loader.calls.borrow(),
            vec!["https://example.com/broken".to_string(), DEFAULT.to_string()]
        );
    }

    #[test]
    fn failing_default_does_not_loop() {
        let mut orch = orchestrator(Some(vibrant_set()));
        let loader = MapLoader::with(&[]);
        let request = orch.start();
        orch.run(&loader, request);

        assert_eq!(orch.phase(), Phase::Error);
        assert_eq!(loader.calls.borrow().len(), 1);
        assert_eq!(orch.take_notifications().len(), 1);
    }

    #[test]
    fn extraction_failure_leaves_absent_accents() {
        let mut orch = orchestrator(None);
        let loader = MapLoader::with(&[DEFAULT]);
        let request = orch.start();
        let state = orch.run(&loader, request);

        assert_eq!(state.phase, Phase::Error);
        assert!(state.accent_default.is_none());
        assert!(state.accent_chilled.is_none());
        assert!(state.last_error.as_deref().unwrap().contains("engine exploded"));
        assert!(state.history.is_empty());
    }

    #[test]
    fn empty_swatch_set_is_ready_without_accents() {
        let mut orch = orchestrator(Some(SwatchSet::new()));
        let loader = MapLoader::with(&[DEFAULT]);
        let request = orch.start();
        let state = orch.run(&loader, request);

        assert_eq!(state.phase, Phase::Ready);
        assert!(state.accent_default.is_none());
        assert!(state.history.is_empty());
    }

    #[test]
    fn stale_results_are_discarded() {
        let mut orch = orchestrator(Some(vibrant_set()));
        let first = orch.submit_image(Some("a.png"));
        let second = orch.submit_image(Some("b.png"));

        assert!(!orch.apply_extraction(first.token, Ok(vibrant_set())));
        assert!(orch.state().accent_default.is_none());
        assert!(orch.history().is_empty());

        assert!(orch.apply_extraction(second.token, Ok(vibrant_set())));
        assert_eq!(orch.history().len(), 1);
    }

    #[test]
    fn stale_decode_failure_is_ignored() {
        let mut orch = orchestrator(Some(vibrant_set()));
        let first = orch.submit_image(Some("a.png"));
        orch.submit_image(Some("b.png"));

        let retry = orch.on_image_decode_failed(first.token, &PipelineError::decode("a.png", "x"));
        assert!(retry.is_none());
        assert!(orch.take_notifications().is_empty());
        assert_eq!(orch.state().image_address, "b.png");
    }

    #[test]
    fn late_load_for_superseded_request_changes_nothing() {
        let mut orch = orchestrator(Some(vibrant_set()));
        let slow = orch.submit_image(Some("slow.png"));
        let fast = orch.submit_image(Some("fast.png"));
        let image = DynamicImage::ImageRgb8(image::RgbImage::new(2, 2));

        assert!(orch.on_image_loaded(fast.token, Ok(image.clone())).is_none());
        assert_eq!(orch.history().len(), 1);

        assert!(orch.on_image_loaded(slow.token, Ok(image)).is_none());
        assert!(orch
            .on_image_loaded(slow.token, Err(PipelineError::decode("slow.png", "timeout")))
            .is_none());
        assert_eq!(orch.history().len(), 1);
        assert_eq!(orch.phase(), Phase::Ready);
        assert_eq!(orch.state().image_address, "fast.png");
        assert!(orch.take_notifications().is_empty());
    }

    #[test]
    fn history_is_loaded_and_extended() {
        let mut store = MemoryStore::new();
        store.set(HISTORY_KEY, r##"["#111111"]"##).unwrap();
        let mut orch = Orchestrator::new(config(), FixedSource(Some(vibrant_set())), store);
        assert_eq!(orch.history(), ["#111111".to_string()]);

        let loader = MapLoader::with(&[DEFAULT]);
        let request = orch.start();
        orch.run(&loader, request);
        assert_eq!(orch.history().len(), 2);
        assert_eq!(orch.history()[0], "#111111");
    }

    #[test]
    fn subscribers_see_every_transition() {
        let seen: Rc<RefCell<Vec<Phase>>> = Rc::default();
        let mut orch = orchestrator(Some(vibrant_set()));
        let sink = Rc::clone(&seen);
        orch.subscribe(move |state| sink.borrow_mut().push(state.phase));

        let loader = MapLoader::with(&[DEFAULT]);
        let request = orch.start();
        orch.run(&loader, request);

        assert_eq!(*seen.borrow(), vec![Phase::Loading, Phase::Ready]);
    }

    #[test]
    fn fixed_high_policy_is_honored() {
        let set: SwatchSet = [Swatch::with_hsl(
            "Vibrant",
            Color::new(100, 110, 120),
            Hsl::new(0.58, 0.2, 0.43),
            5,
        )]
        .into_iter()
        .collect();
        let config = PipelineConfig {
            saturation_policy: SaturationPolicy::FixedHigh,
            ..config()
        };
        let mut orch = Orchestrator::new(config, FixedSource(Some(set)), MemoryStore::new());
        let loader = MapLoader::with(&[DEFAULT]);
        let request = orch.start();
        let state = orch.run(&loader, request);
        assert_eq!(state.accent_chilled.as_ref().unwrap().hsl.s, 0.8);
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let orch = orchestrator(Some(vibrant_set()));
        let json = serde_json::to_value(orch.snapshot()).unwrap();
        assert_eq!(json["imageAddress"], DEFAULT);
        assert_eq!(json["phase"], "idle");
        assert!(json["accentDefault"].is_null());
    }
}
