//! The tick-driven facade that owns every component and applies control
//! commands.
//!
//! Everything happens on the caller's thread, inside [`Engine::tick`] and
//! [`Engine::apply`]. The only asynchronous piece is the capture service,
//! which answers over a channel the engine drains at the start of each tick.

use crate::annotation::{AnnotationId, AnnotationKind, MarkerColor, Placement};
use crate::announcer::{Announcer, Feedback, FeedbackQueue, LogSpeaker, Speaker};
use crate::capture::{CaptureGate, CaptureId, CaptureOutcome, CaptureRequest, CaptureService};
use crate::command::ControlCommand;
use crate::cone_sampler::{ConeSampler, SampleResult};
use crate::config::EngineConfig;
use crate::dedup::{DedupIndex, Namespace};
use crate::error::EngineError;
use crate::geometry::{Point, Pose, Seconds};
use crate::probe::SpatialProbe;
use crate::proximity_audio::{AudioConfig, AudioParams, Falloff};
use crate::region_merger::{merge_regions, project_region, CameraFrame, RawTextSample};
use crate::registry::AnnotationRegistry;
use crate::scheduler::{RefreshScheduler, RefreshTrigger};
use crate::spotlight::SpotlightGate;
use log::{debug, info, warn};
use rand::{rngs::StdRng, SeedableRng};
use std::sync::mpsc::{self, Receiver, Sender};

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    /// The beacon set was cleared and regenerated
    pub regenerated: bool,
    /// A capture outcome was accepted and processed
    pub capture_completed: Option<CaptureId>,
    /// The capture in flight was given up on
    pub capture_timed_out: bool,
    /// A capture is still in flight after this tick
    pub capture_in_flight: bool,
}

/// What a renderer or audio device needs to know about one annotation.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct AnnotationView {
    pub id: AnnotationId,
    pub kind: AnnotationKind,
    pub position: Point,
    pub facing: Point,
    pub text: Option<String>,
    pub muted: bool,
    pub color: MarkerColor,
    pub audio: AudioParams,
}

/// What became of one placement candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placed {
    Duplicate,
    Created,
    /// Created, leaving the registry above its maximum.
    OverCapacity,
}

impl Placed {
    fn created(self) -> bool {
        self != Placed::Duplicate
    }
}

/// The annotation engine.
pub struct Engine<P: SpatialProbe> {
    config: EngineConfig,
    probe: P,
    registry: AnnotationRegistry,
    dedup: DedupIndex,
    sampler: ConeSampler,
    scheduler: RefreshScheduler,
    spotlight: SpotlightGate,
    audio: AudioConfig,
    gate: CaptureGate,
    capture: Option<Box<dyn CaptureService>>,
    in_flight_camera: Option<CameraFrame>,
    reply_tx: Sender<CaptureOutcome>,
    reply_rx: Receiver<CaptureOutcome>,
    announcer: Announcer,
    feedback: FeedbackQueue,
    rng: StdRng,
    clock: Seconds,
}

/// Builds an [`Engine`].
pub struct EngineBuilder<P: SpatialProbe> {
    probe: P,
    config: EngineConfig,
    speaker: Box<dyn Speaker>,
    capture: Option<Box<dyn CaptureService>>,
    seed: Option<u64>,
}

impl<P: SpatialProbe> EngineBuilder<P> {
    #[allow(missing_docs)]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the default [`LogSpeaker`].
    pub fn speaker(mut self, speaker: Box<dyn Speaker>) -> Self {
        self.speaker = speaker;
        self
    }

    /// Attaches the OCR service. Without one, capture requests fail with
    /// [`EngineError::CaptureUnavailable`].
    pub fn capture_service(mut self, service: Box<dyn CaptureService>) -> Self {
        self.capture = Some(service);
        self
    }

    /// Seeds the sampler's random source, for reproducible runs.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[allow(missing_docs)]
    pub fn build(self) -> Engine<P> {
        let config = self.config;
        let (reply_tx, reply_rx) = mpsc::channel();
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Engine {
            probe: self.probe,
            registry: AnnotationRegistry::new(config.max_annotations),
            dedup: DedupIndex::new(config.dedup.tolerance, config.dedup.proximity_radius),
            sampler: ConeSampler::new(config.sampler),
            scheduler: RefreshScheduler::new(config.refresh),
            spotlight: SpotlightGate::new(config.spotlight),
            audio: config.audio,
            gate: CaptureGate::new(config.capture_timeout),
            capture: self.capture,
            in_flight_camera: None,
            reply_tx,
            reply_rx,
            announcer: Announcer::new(self.speaker, config.speech.interval),
            feedback: FeedbackQueue::default(),
            rng,
            clock: 0.0,
            config,
        }
    }
}

impl<P: SpatialProbe> Engine<P> {
    /// Starts building an engine over the given scene.
    pub fn builder(probe: P) -> EngineBuilder<P> {
        EngineBuilder {
            probe,
            config: EngineConfig::default(),
            speaker: Box::new(LogSpeaker),
            capture: None,
            seed: None,
        }
    }

    /// Advances the engine by `dt` seconds with the user at `pose`.
    pub fn tick(&mut self, pose: &Pose, dt: Seconds) -> TickReport {
        let mut report = TickReport::default();
        self.clock += dt;

        report.capture_completed = self.drain_captures();

        if self.gate.tick(dt) {
            warn!("capture timed out after {:.1}s", self.config.capture_timeout);
            self.in_flight_camera = None;
            report.capture_timed_out = true;
        }

        if self.scheduler.tick(pose.position, dt) {
            self.regenerate(pose);
            report.regenerated = true;
        }

        self.spotlight.apply(&mut self.registry, &self.probe, pose);
        self.announcer.tick(dt);

        report.capture_in_flight = self.gate.in_flight();
        report
    }

    /// Parses and applies one textual control command.
    pub fn apply_str(&mut self, line: &str, pose: &Pose) -> Result<(), EngineError> {
        let command: ControlCommand = line.parse()?;
        self.apply(command, pose)
    }

    /// Applies one control command.
    pub fn apply(&mut self, command: ControlCommand, pose: &Pose) -> Result<(), EngineError> {
        debug!("applying {:?}", command);
        use ControlCommand as CC;
        match command {
            CC::Obstacles(true) => {
                if self.scheduler.activate(pose.position) {
                    self.regenerate(pose);
                }
                self.say(Feedback::ObstaclesOn);
            }
            CC::Obstacles(false) => {
                if self.scheduler.deactivate() {
                    self.clear_beacons();
                }
                self.say(Feedback::ObstaclesOff);
            }
            CC::RefreshDistance(meters) => {
                self.scheduler
                    .set_trigger(RefreshTrigger::Distance, meters, pose.position)?;
            }
            CC::RefreshTime(seconds) => {
                self.scheduler
                    .set_trigger(RefreshTrigger::Time, seconds, pose.position)?;
            }
            CC::MoreSamples => self.sampler.more_samples(),
            CC::FewerSamples => self.sampler.fewer_samples(),
            CC::WiderSpread => self.sampler.wider_spread(),
            CC::NarrowerSpread => self.sampler.narrower_spread(),
            CC::Spotlight(on) => {
                self.spotlight.set_enabled(on, &mut self.registry);
                self.say(if on {
                    Feedback::SpotlightOn
                } else {
                    Feedback::SpotlightOff
                });
            }
            CC::Proximity(on) => {
                self.audio.falloff = if on {
                    Falloff::Logarithmic
                } else {
                    Falloff::Linear
                };
                if self.scheduler.is_active() {
                    self.regenerate(pose);
                    self.scheduler.reanchor(pose.position);
                }
            }
            CC::ClearObstacles => self.clear_beacons(),
            CC::ClearText => self.clear_text(),
            CC::Tolerance(n) => self.dedup.set_tolerance(n),
            CC::LocateText => {
                self.request_capture(pose)?;
            }
            CC::ReadText => self.read_text(pose),
            CC::SingleShot => {
                let result = self
                    .sampler
                    .single_shot(&self.probe, pose.position, pose.forward);
                if let SampleResult::Placement(placement) = result {
                    if self.place(Namespace::Beacon, placement) == Placed::OverCapacity {
                        self.say(Feedback::TooManyIcons);
                    }
                    self.sync_markers();
                }
            }
            CC::CountIcons => self.say(Feedback::IconCount(self.registry.len())),
            CC::Stop => self.announcer.interrupt(),
        }
        Ok(())
    }

    /// Starts an OCR pass looking where the user is looking.
    ///
    /// Rejected, not queued, while another pass is in flight.
    pub fn request_capture(&mut self, pose: &Pose) -> Result<CaptureId, EngineError> {
        if self.capture.is_none() {
            return Err(EngineError::CaptureUnavailable);
        }
        let Some(id) = self.gate.try_begin() else {
            self.say(Feedback::StillReading);
            return Err(EngineError::ConcurrentCaptureRejected);
        };

        let camera = CameraFrame::looking(pose.position, pose.forward);
        self.in_flight_camera = Some(camera);
        if let Some(service) = self.capture.as_mut() {
            service.submit(CaptureRequest { id, camera }, self.reply_tx.clone());
        }
        info!("capture {} submitted", id);
        Ok(id)
    }

    fn drain_captures(&mut self) -> Option<CaptureId> {
        let mut completed = None;
        while let Ok(outcome) = self.reply_rx.try_recv() {
            if !self.gate.complete(outcome.id) {
                continue;
            }
            let Some(camera) = self.in_flight_camera.take() else {
                continue;
            };
            match outcome.result {
                Ok(samples) => self.place_text(&samples, &camera),
                Err(reason) => {
                    warn!("capture {} failed: {}", outcome.id, reason);
                    self.say(Feedback::CaptureFailed);
                }
            }
            completed = Some(outcome.id);
        }
        completed
    }

    /// Merge, project, dedup and create: one OCR result becomes regions.
    fn place_text(&mut self, samples: &[RawTextSample], camera: &CameraFrame) {
        if samples.is_empty() {
            self.say(Feedback::NoTextFound);
            return;
        }

        let mut created = 0;
        let mut over_capacity = false;
        for region in merge_regions(samples, self.config.combine_threshold) {
            let Some(anchor) = project_region(&self.probe, camera, &region) else {
                debug!("region '{}' did not land on anything", region.text);
                continue;
            };
            let placement = Placement::region(&anchor.text, anchor.point, anchor.normal, anchor.radius);
            let placed = self.place(Namespace::Text, placement);
            over_capacity |= placed == Placed::OverCapacity;
            if placed.created() {
                created += 1;
            }
        }
        self.sync_markers();
        if over_capacity {
            self.say(Feedback::TooManyIcons);
        }

        if created == 0 {
            self.say(Feedback::NoNewText);
        } else {
            info!("{} text region(s) placed", created);
            self.say(Feedback::RegionsDetected(created));
        }
    }

    /// Runs a placement through the dedup index and creates it when novel.
    /// Capacity is only reported; callers decide when to tell the user.
    fn place(&mut self, ns: Namespace, placement: Placement) -> Placed {
        let payload = placement.dedup_payload().to_owned();
        let position = placement.position;
        let registry = &mut self.registry;
        let now = self.clock;
        let mut over_capacity = None;

        let rejected = self.dedup.check_and_maybe_reject(ns, &payload, position, || {
            let created = registry.create(placement, now);
            over_capacity = created.over_capacity;
            created.id
        });

        match (rejected, over_capacity) {
            (true, _) => Placed::Duplicate,
            (false, Some(_)) => Placed::OverCapacity,
            (false, None) => Placed::Created,
        }
    }

    /// Clears the beacons and runs one fresh placement pass, as a single
    /// step. The scene drops the cleared colliders before the pass probes it.
    fn regenerate(&mut self, pose: &Pose) {
        let removed = self.registry.clear_beacons().len();
        self.dedup.purge(Namespace::Beacon);
        self.sync_markers();

        let results = self
            .sampler
            .sample(&self.probe, &mut self.rng, pose.position, pose.forward);
        let mut placed = 0;
        let mut over_capacity = false;
        for result in results {
            if let SampleResult::Placement(placement) = result {
                let outcome = self.place(Namespace::Beacon, placement);
                over_capacity |= outcome == Placed::OverCapacity;
                if outcome.created() {
                    placed += 1;
                }
            }
        }
        self.sync_markers();
        if over_capacity {
            self.say(Feedback::TooManyIcons);
        }
        info!(
            "regenerated beacons at {}: {} removed, {} placed",
            pose.position, removed, placed
        );
    }

    fn clear_beacons(&mut self) {
        self.registry.clear_beacons();
        self.dedup.purge(Namespace::Beacon);
        self.sync_markers();
    }

    fn clear_text(&mut self) {
        self.registry.clear_text();
        self.dedup.purge(Namespace::Text);
        self.sync_markers();
    }

    /// Removes one annotation and forgets its dedup entry.
    pub fn destroy(&mut self, id: AnnotationId) -> bool {
        let removed = self.registry.destroy(id).is_some();
        if removed {
            self.dedup.remove(id);
            self.sync_markers();
        }
        removed
    }

    fn sync_markers(&mut self) {
        let markers = self.registry.markers();
        self.probe.sync_markers(&markers);
    }

    /// Announces the text regions within the reading cone, nearest first.
    fn read_text(&mut self, pose: &Pose) {
        let max_angle = self.config.read_angle_degrees.to_radians();
        let mut in_view: Vec<(f64, String)> = self
            .registry
            .iter()
            .filter(|a| a.kind() == AnnotationKind::TextRegion)
            .filter(|a| pose.forward.angle_to(&(a.position() - pose.position)) <= max_angle)
            .filter_map(|a| {
                a.text()
                    .map(|t| (a.position().abs_dist(&pose.position), t.to_owned()))
            })
            .collect();
        in_view.sort_by(|a, b| a.0.total_cmp(&b.0));

        self.say(Feedback::TextInView(in_view.len()));
        for (_, text) in in_view {
            if text.chars().count() >= self.config.speech.max_text_length {
                self.say(Feedback::TextTooLong);
            } else {
                self.say(Feedback::Read(text));
            }
        }
    }

    fn say(&mut self, feedback: Feedback) {
        self.announcer.announce(&feedback);
        self.feedback.push(feedback);
    }

    /// Everything the engine has said since the last call.
    pub fn drain_feedback(&mut self) -> Vec<Feedback> {
        self.feedback.by_ref().collect()
    }

    /// Snapshot of every live annotation with its audio parameters relative
    /// to `pose`.
    pub fn annotations_view(&self, pose: &Pose) -> Vec<AnnotationView> {
        self.registry
            .iter()
            .map(|a| AnnotationView {
                id: a.id(),
                kind: a.kind(),
                position: a.position(),
                facing: a.facing(),
                text: a.text().map(str::to_owned),
                muted: a.is_muted(),
                color: a.color(),
                audio: self.audio.params(
                    a.position().y - pose.position.y,
                    a.position().abs_dist(&pose.position),
                    a.is_muted(),
                ),
            })
            .collect()
    }

    #[allow(missing_docs)]
    pub fn registry(&self) -> &AnnotationRegistry {
        &self.registry
    }

    #[allow(missing_docs)]
    pub fn dedup(&self) -> &DedupIndex {
        &self.dedup
    }

    #[allow(missing_docs)]
    pub fn sampler(&self) -> &ConeSampler {
        &self.sampler
    }

    #[allow(missing_docs)]
    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    #[allow(missing_docs)]
    pub fn spotlight(&self) -> &SpotlightGate {
        &self.spotlight
    }

    #[allow(missing_docs)]
    pub fn audio(&self) -> &AudioConfig {
        &self.audio
    }

    #[allow(missing_docs)]
    pub fn probe(&self) -> &P {
        &self.probe
    }

    #[allow(missing_docs)]
    pub fn capture_in_flight(&self) -> bool {
        self.gate.in_flight()
    }

    /// Seconds of tick time since the engine was built.
    pub fn clock(&self) -> Seconds {
        self.clock
    }
}
