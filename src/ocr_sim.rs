//! A [`CaptureService`] that "reads" the signs of a [`SyntheticRoom`] on a
//! worker thread, with a configurable latency, so the engine's asynchronous
//! capture path can be exercised without a camera or a network.

use crate::capture::{CaptureOutcome, CaptureRequest, CaptureService};
use crate::geometry::{Point, Seconds};
use crate::region_merger::{CameraFrame, Quad, RawTextSample};
use crate::room::Sign;
use log::{debug, warn};
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Duration;

/// Fraction of a character's width left between two words.
const WORD_GAP: f64 = 0.25;

enum Signal {
    Capture(CaptureRequest, Sender<CaptureOutcome>),
    Stop,
}

/// Worker-thread OCR over a fixed set of signs.
pub struct SimulatedOcr {
    handle: Option<thread::JoinHandle<()>>,
    tx: Sender<Signal>,
}

impl SimulatedOcr {
    /// Starts the worker. Every capture takes `latency` seconds of wall
    /// time to answer.
    pub fn new(signs: Vec<Sign>, latency: Seconds) -> Self {
        let (tx, rx) = mpsc::channel::<Signal>();
        let latency = match latency.is_finite() {
            true => Duration::from_secs_f64(latency.max(0.0)),
            false => Duration::ZERO,
        };

        let handle = thread::spawn(move || {
            // Ends when asked to, or when every sender is gone.
            while let Ok(signal) = rx.recv() {
                match signal {
                    Signal::Capture(request, reply) => {
                        thread::sleep(latency);
                        let samples = read_signs(&signs, &request.camera);
                        debug!("capture {}: {} word(s) read", request.id, samples.len());
                        let outcome = CaptureOutcome {
                            id: request.id,
                            result: Ok(samples),
                        };
                        if reply.send(outcome).is_err() {
                            debug!("capture {} finished after the engine went away", request.id);
                        }
                    }
                    Signal::Stop => break,
                }
            }
        });

        SimulatedOcr {
            handle: Some(handle),
            tx,
        }
    }

    /// Stops the worker and waits for it to finish.
    pub fn stop(&mut self) {
        let _ = self.tx.send(Signal::Stop);
        if let Some(thread) = self.handle.take() {
            if thread.join().is_err() {
                warn!("ocr worker panicked");
            }
        }
    }
}

impl CaptureService for SimulatedOcr {
    fn submit(&mut self, request: CaptureRequest, reply: Sender<CaptureOutcome>) {
        let id = request.id;
        if self.tx.send(Signal::Capture(request, reply)).is_err() {
            warn!("ocr worker is gone; capture {} will time out", id);
        }
    }
}

impl Drop for SimulatedOcr {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One sample per word of every sign that faces the camera and lies fully
/// inside the frame, in left-to-right reading order within each sign.
pub fn read_signs(signs: &[Sign], camera: &CameraFrame) -> Vec<RawTextSample> {
    signs
        .iter()
        .filter(|s| s.normal.dot(&(camera.position - s.center)) > 0.0)
        .filter_map(|s| read_sign(s, camera))
        .flatten()
        .collect()
}

fn read_sign(sign: &Sign, camera: &CameraFrame) -> Option<Vec<RawTextSample>> {
    let words: Vec<&str> = sign.text.split_whitespace().collect();
    let chars: usize = words.iter().map(|w| w.chars().count()).sum();
    if chars == 0 {
        return None;
    }
    let slots = chars as f64 + WORD_GAP * (words.len() - 1) as f64;
    let char_width = sign.width / slots;

    // Reading direction as seen from in front of the sign.
    let right = Point::UP.cross(&(-sign.normal)).normalized();
    let up = Point::UP * (sign.height / 2.0);
    let left_edge = sign.center - right * (sign.width / 2.0);

    let mut offset = 0.0;
    let mut samples = Vec::with_capacity(words.len());
    for word in words {
        let w = word.chars().count() as f64 * char_width;
        let l = left_edge + right * offset;
        let r = left_edge + right * (offset + w);
        let corners = [l + up, r + up, r - up, l - up];

        let mut pixels = Vec::with_capacity(4);
        for corner in corners {
            let pixel = camera.project(corner)?;
            if !camera.contains(pixel) {
                return None;
            }
            pixels.push(pixel);
        }
        samples.push(RawTextSample::new(
            Quad {
                top_left: pixels[0],
                top_right: pixels[1],
                bottom_right: pixels[2],
                bottom_left: pixels[3],
            },
            word,
        ));
        offset += w + WORD_GAP * char_width;
    }
    Some(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureId;
    use crate::region_merger::{merge_regions, COMBINE_THRESHOLD};
    use crate::room::SyntheticRoom;

    fn facing_far_wall() -> CameraFrame {
        CameraFrame::looking(Point::new(0.0, 1.7, 0.0), Point::new(0.0, 0.0, 1.0))
    }

    #[test]
    fn words_come_out_left_to_right_and_merge_per_sign() {
        let room = SyntheticRoom::demo();
        let samples = read_signs(room.signs(), &facing_far_wall());
        let words: Vec<&str> = samples.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(words, vec!["EMERGENCY", "EXIT", "ROOM", "204"]);
        assert!(samples[0].quad.top_left.x < samples[1].quad.top_left.x);

        let regions = merge_regions(&samples, COMBINE_THRESHOLD);
        let texts: Vec<&str> = regions.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["EMERGENCY EXIT", "ROOM 204"]);
    }

    #[test]
    fn signs_behind_or_out_of_frame_are_not_read() {
        let room = SyntheticRoom::demo();
        let away = CameraFrame::looking(Point::new(0.0, 1.7, 2.0), Point::new(0.0, 0.0, -1.0));
        assert!(read_signs(room.signs(), &away).is_empty());

        let sideways = CameraFrame::looking(Point::new(0.0, 1.7, 2.0), Point::new(1.0, 0.0, 0.2));
        assert!(read_signs(room.signs(), &sideways).is_empty());
    }

    #[test]
    fn worker_replies_on_the_given_channel() {
        let room = SyntheticRoom::demo();
        let mut ocr = SimulatedOcr::new(room.signs().to_vec(), 0.0);
        let (tx, rx) = mpsc::channel();
        let id: CaptureId = 42;
        ocr.submit(
            CaptureRequest {
                id,
                camera: facing_far_wall(),
            },
            tx,
        );
        let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(outcome.id, id);
        assert_eq!(outcome.result.unwrap().len(), 4);
        ocr.stop();
    }
}
