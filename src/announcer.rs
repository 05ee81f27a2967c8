//! Spoken feedback.
//!
//! Everything the engine wants to tell the user goes through a FIFO of
//! utterances in front of an external text-to-speech [`Speaker`]. The queue
//! is serviced on a fixed interval of tick time and keeps at most one
//! utterance in progress.

use crate::geometry::Seconds;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::Display;

/// `Speaker`
///
/// The text-to-speech collaborator. `speak` must not block.
pub trait Speaker {
    /// Starts saying `text`.
    fn speak(&mut self, text: &str);
    /// True while an utterance is still playing.
    fn is_speaking(&self) -> bool;
    /// Cuts the current utterance short.
    fn stop(&mut self);
}

/// A [`Speaker`] that writes every utterance to the log and finishes
/// instantly. Used by the binaries.
#[derive(Debug, Default)]
pub struct LogSpeaker;

impl Speaker for LogSpeaker {
    fn speak(&mut self, text: &str) {
        info!("speech: {}", text);
    }

    fn is_speaking(&self) -> bool {
        false
    }

    fn stop(&mut self) {}
}

/// Things the engine says.
#[derive(Debug, Clone, PartialEq)]
pub enum Feedback {
    #[allow(missing_docs)]
    ObstaclesOn,
    #[allow(missing_docs)]
    ObstaclesOff,
    #[allow(missing_docs)]
    SpotlightOn,
    #[allow(missing_docs)]
    SpotlightOff,
    /// A capture returned no text at all
    NoTextFound,
    /// Every region a capture found was already annotated
    NoNewText,
    /// A capture created this many regions
    RegionsDetected(usize),
    /// A capture was requested while another was running
    StillReading,
    /// The capture service reported a failure
    CaptureFailed,
    /// The registry is over its maximum
    TooManyIcons,
    /// Answer to an icon count query
    IconCount(usize),
    /// How many text regions are in view before reading them
    TextInView(usize),
    /// A region's text, read aloud
    Read(String),
    /// A region's text is too long to read aloud
    TextTooLong,
}

impl Display for Feedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Feedback as F;
        match self {
            F::ObstaclesOn => write!(f, "Obstacle mode on."),
            F::ObstaclesOff => write!(f, "Obstacle mode off."),
            F::SpotlightOn => write!(f, "Spotlight mode on."),
            F::SpotlightOff => write!(f, "Spotlight mode off."),
            F::NoTextFound => write!(f, "No text found."),
            F::NoNewText => write!(f, "No new text detected."),
            F::RegionsDetected(1) => write!(f, "1 region of text detected."),
            F::RegionsDetected(n) => write!(f, "{} regions of text detected.", n),
            F::StillReading => write!(f, "Please wait, still reading text."),
            F::CaptureFailed => write!(f, "Text recognition failed."),
            F::TooManyIcons => write!(
                f,
                "There are too many icons. Please clear icons before finding new text."
            ),
            F::IconCount(n) => write!(f, "There are {} icons in the scene.", n),
            F::TextInView(1) => write!(f, "1 text region in view."),
            F::TextInView(n) => write!(f, "{} text regions in view.", n),
            F::Read(text) => write!(f, "{}", text),
            F::TextTooLong => write!(f, "Text is too long to read."),
        }
    }
}

/// Everything said since the last drain, for callers that want the
/// feedback as data rather than speech.
#[derive(Debug, Default)]
pub struct FeedbackQueue {
    items: VecDeque<Feedback>,
}

impl FeedbackQueue {
    #[allow(missing_docs)]
    pub fn push(&mut self, feedback: Feedback) {
        self.items.push_back(feedback);
    }
}

impl Iterator for FeedbackQueue {
    type Item = Feedback;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.pop_front()
    }
}

/// Phase of the utterance at the head of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechState {
    /// Nothing in progress
    Idle,
    /// Handed to the speaker, not yet observed speaking
    Starting,
    /// Observed speaking; waiting for it to finish
    PollingForCompletion,
}

/// Timing of the speech queue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// How often the queue is serviced
    pub interval: Seconds,
    /// Texts this long or longer are not read aloud
    pub max_text_length: usize,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        SpeechConfig {
            interval: 0.25,
            max_text_length: 60,
        }
    }
}

/// The utterance queue.
pub struct Announcer {
    speaker: Box<dyn Speaker>,
    queue: VecDeque<String>,
    state: SpeechState,
    interval: Seconds,
    since_service: Seconds,
    interrupt: bool,
}

impl Announcer {
    #[allow(missing_docs)]
    pub fn new(speaker: Box<dyn Speaker>, interval: Seconds) -> Self {
        Announcer {
            speaker,
            queue: VecDeque::new(),
            state: SpeechState::Idle,
            interval,
            since_service: 0.0,
            interrupt: false,
        }
    }

    /// Queues an utterance behind whatever is already waiting.
    pub fn announce(&mut self, feedback: &Feedback) {
        let text = feedback.to_string();
        debug!("queueing speech: {}", text);
        self.queue.push_back(text);
    }

    /// Asks for silence. Takes effect on the next [`Announcer::tick`].
    pub fn interrupt(&mut self) {
        self.interrupt = true;
    }

    #[allow(missing_docs)]
    pub fn state(&self) -> SpeechState {
        self.state
    }

    /// Utterances not yet handed to the speaker.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Advances the interval timer and services the queue when it is due.
    pub fn tick(&mut self, dt: Seconds) {
        if self.interrupt {
            self.interrupt = false;
            self.speaker.stop();
            self.queue.clear();
            self.state = SpeechState::Idle;
            self.since_service = 0.0;
            return;
        }

        self.since_service += dt;
        if self.since_service < self.interval {
            return;
        }
        self.since_service = 0.0;
        self.service();
    }

    fn service(&mut self) {
        let speaking = self.speaker.is_speaking();

        // A speaker that has already finished by the first poll never shows
        // up as speaking; treat that as done.
        self.state = match (self.state, speaking) {
            (SpeechState::Starting, true) => SpeechState::PollingForCompletion,
            (SpeechState::Starting, false) => SpeechState::Idle,
            (SpeechState::PollingForCompletion, false) => SpeechState::Idle,
            (state, _) => state,
        };

        if self.state == SpeechState::Idle {
            if let Some(text) = self.queue.pop_front() {
                self.state = SpeechState::Starting;
                self.speaker.speak(&text);
            }
        }
    }
}
