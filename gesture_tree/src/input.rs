//! The gesture lane: a worker thread that owns the hand tracker.
//!
//! The worker opens the tracker, polls frames, classifies them and writes
//! the shared [`ModeSignal`].  The render lane never waits on it: it only
//! drains [`GestureStatus`] updates from a channel once per frame.
//!
//! | Tracker result | Worker action |
//! |---|---|
//! | `Pending`, or a frame whose timestamp did not advance | nothing |
//! | `Captured { hand: Some(..) }` | classify, update the signal |
//! | `Captured { hand: None }` | mark the hand lost, zero steering |
//! | `Err(Detection)` | `warn!`, skip the frame |
//! | any other `Err` | `warn!`, close the tracker, report `Unavailable` |

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{info, warn};
use tree_motion::{apply_observation, SharedSignal};

use crate::tracker::{CaptureHints, HandTracker, TrackerError, TrackerFrame};

/// How long one poll may block; bounds the shutdown latency.
pub const POLL_TIMEOUT: Duration = Duration::from_millis(50);

// ════════════════════════════════════════════════════════════════════════════
// GestureStatus
// ════════════════════════════════════════════════════════════════════════════

/// Lifecycle of the gesture lane as seen by the render lane.
#[derive(Clone, Debug, PartialEq)]
pub enum GestureStatus {
    /// The tracker is being opened.
    Initializing,
    /// Frames are flowing from the named tracker.
    Active { tracker: &'static str },
    /// The tracker failed; the app continues with click input only.
    Unavailable(TrackerError),
    /// Shut down on request.
    Stopped,
    /// No gesture backend was configured.
    Disabled,
}

impl GestureStatus {
    /// Text for the status bar.
    pub fn label(&self) -> String {
        match self {
            GestureStatus::Initializing       => "INIT AI...".to_string(),
            GestureStatus::Active { tracker } => format!("AI READY ({})", tracker),
            GestureStatus::Unavailable(e)     => format!("{} (mouse mode)", e.status_label()),
            GestureStatus::Stopped            => "AI STOPPED".to_string(),
            GestureStatus::Disabled           => "MOUSE MODE".to_string(),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, GestureStatus::Active { .. })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureInput
// ════════════════════════════════════════════════════════════════════════════

/// Handle to a running gesture worker.  Dropping it shuts the worker down.
pub struct GestureInput {
    stop:      Arc<AtomicBool>,
    status_rx: Receiver<GestureStatus>,
    worker:    Option<JoinHandle<()>>,
}

/// Spawn the gesture lane around `tracker`.
pub fn spawn_gesture_input(
    tracker: Box<dyn HandTracker>,
    signal:  SharedSignal,
    hints:   CaptureHints,
) -> GestureInput {
    let stop = Arc::new(AtomicBool::new(false));
    let (status_tx, status_rx) = mpsc::channel();

    let worker = {
        let stop = Arc::clone(&stop);
        thread::Builder::new()
            .name("gesture-input".into())
            .spawn(move || run_worker(tracker, signal, hints, stop, status_tx))
    };

    let worker = match worker {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("could not start gesture thread: {}", e);
            None
        }
    };
    GestureInput { stop, status_rx, worker }
}

impl GestureInput {
    /// All status updates since the last call, oldest first.
    pub fn drain_status(&self) -> Vec<GestureStatus> {
        self.status_rx.try_iter().collect()
    }

    /// The most recent status update, if any arrived since the last call.
    pub fn poll_status(&self) -> Option<GestureStatus> {
        self.drain_status().pop()
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the worker and wait for it.  Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("gesture thread panicked");
            }
        }
    }
}

impl Drop for GestureInput {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── worker ────────────────────────────────────────────────────────────────

fn run_worker(
    mut tracker: Box<dyn HandTracker>,
    signal:      SharedSignal,
    hints:       CaptureHints,
    stop:        Arc<AtomicBool>,
    status_tx:   Sender<GestureStatus>,
) {
    let _ = status_tx.send(GestureStatus::Initializing);

    if let Err(e) = tracker.open(&hints) {
        warn!("{} failed to open: {}", tracker.name(), e);
        tracker.close();
        let _ = status_tx.send(GestureStatus::Unavailable(e));
        return;
    }
    info!("{} opened ({}x{} @ {} fps)", tracker.name(), hints.width, hints.height, hints.frame_rate);
    let _ = status_tx.send(GestureStatus::Active { tracker: tracker.name() });

    let mut last_frame: Option<Duration> = None;
    let end = loop {
        if stop.load(Ordering::Acquire) {
            break GestureStatus::Stopped;
        }
        match tracker.next_frame(POLL_TIMEOUT) {
            Ok(TrackerFrame::Pending) => {}
            Ok(TrackerFrame::Captured { timestamp, hand }) => {
                if last_frame.is_some_and(|prev| timestamp <= prev) {
                    continue;
                }
                last_frame = Some(timestamp);
                apply_observation(&signal, hand.as_ref());
            }
            Err(e) if e.is_per_frame() => warn!("skipping frame: {}", e),
            Err(e) => {
                warn!("{} lost: {}", tracker.name(), e);
                break GestureStatus::Unavailable(e);
            }
        }
    };

    tracker.close();
    info!("{} closed", tracker.name());
    let _ = status_tx.send(end);
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    use glam::Vec2;
    use pretty_assertions::assert_eq;
    use tree_motion::{GestureLabel, Mode, ModeSignal};

    use crate::tracker::{synthetic_hand, SimPose};

    /// Replays a fixed script, then idles.
    struct ScriptedTracker {
        open_result: Result<(), TrackerError>,
        script:      VecDeque<Result<TrackerFrame, TrackerError>>,
        closes:      Arc<AtomicUsize>,
    }

    impl ScriptedTracker {
        fn new(script: Vec<Result<TrackerFrame, TrackerError>>) -> (Self, Arc<AtomicUsize>) {
            let closes = Arc::new(AtomicUsize::new(0));
            let tracker = ScriptedTracker {
                open_result: Ok(()),
                script:      script.into(),
                closes:      Arc::clone(&closes),
            };
            (tracker, closes)
        }
    }

    impl HandTracker for ScriptedTracker {
        fn name(&self) -> &'static str { "scripted" }

        fn open(&mut self, _hints: &CaptureHints) -> Result<(), TrackerError> {
            self.open_result.clone()
        }

        fn next_frame(&mut self, _timeout: Duration) -> Result<TrackerFrame, TrackerError> {
            match self.script.pop_front() {
                Some(step) => step,
                None => {
                    thread::sleep(Duration::from_millis(1));
                    Ok(TrackerFrame::Pending)
                }
            }
        }

        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn at(ms: u64, pose: Option<SimPose>, x: f32) -> Result<TrackerFrame, TrackerError> {
        Ok(TrackerFrame::Captured {
            timestamp: Duration::from_millis(ms),
            hand:      pose.map(|p| synthetic_hand(p, Vec2::new(x, 0.5))),
        })
    }

    /// Run a script that ends in a disconnect and wait for the worker.
    fn run_script(
        script: Vec<Result<TrackerFrame, TrackerError>>,
    ) -> (SharedSignal, Vec<GestureStatus>, Arc<AtomicUsize>) {
        let signal = ModeSignal::shared();
        let mut script = script;
        script.push(Err(TrackerError::Disconnected));
        let (tracker, closes) = ScriptedTracker::new(script);

        let mut input = spawn_gesture_input(Box::new(tracker), Arc::clone(&signal), CaptureHints::default());
        while input.is_running() {
            thread::sleep(Duration::from_millis(1));
        }
        input.shutdown();
        let statuses = input.drain_status();
        (signal, statuses, closes)
    }

    #[test]
    fn palm_then_fist_drive_the_mode() {
        let (signal, statuses, closes) = run_script(vec![
            at(10, Some(SimPose::Palm), 0.9),
        ]);
        assert_eq!(signal.mode(), Mode::Exploded);
        assert!(signal.steering_offset() > 0.0);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert_eq!(statuses, vec![
            GestureStatus::Initializing,
            GestureStatus::Active { tracker: "scripted" },
            GestureStatus::Unavailable(TrackerError::Disconnected),
        ]);

        let (signal, _, _) = run_script(vec![
            at(10, Some(SimPose::Palm), 0.9),
            at(20, Some(SimPose::Fist), 0.9),
        ]);
        assert_eq!(signal.mode(), Mode::Assembled);
        assert_eq!(signal.steering_offset(), 0.0);
    }

    #[test]
    fn detection_errors_skip_one_frame() {
        let (signal, statuses, _) = run_script(vec![
            Err(TrackerError::Detection("blurred".into())),
            at(10, Some(SimPose::Palm), 0.5),
        ]);
        assert_eq!(signal.mode(), Mode::Exploded);
        assert_eq!(signal.last_gesture().label, GestureLabel::Palm);
        assert!(!statuses.iter().any(|s| matches!(s, GestureStatus::Unavailable(TrackerError::Detection(_)))));
    }

    #[test]
    fn stale_timestamps_are_ignored() {
        let (signal, _, _) = run_script(vec![
            at(20, Some(SimPose::Palm), 0.5),
            at(20, Some(SimPose::Fist), 0.5),
            at(15, Some(SimPose::Fist), 0.5),
        ]);
        assert_eq!(signal.mode(), Mode::Exploded);
    }

    #[test]
    fn empty_frame_marks_hand_lost() {
        let (signal, _, _) = run_script(vec![
            at(10, Some(SimPose::Palm), 0.9),
            at(20, None, 0.0),
        ]);
        let reading = signal.last_gesture();
        assert!(!reading.hand_detected);
        assert_eq!(reading.label, GestureLabel::Palm);
        assert_eq!(signal.steering_offset(), 0.0);
        // Losing the hand does not change the mode.
        assert_eq!(signal.mode(), Mode::Exploded);
    }

    #[test]
    fn open_failure_leaves_signal_untouched() {
        let signal = ModeSignal::shared();
        let (mut tracker, closes) = ScriptedTracker::new(vec![]);
        tracker.open_result = Err(TrackerError::PermissionDenied);

        let mut input = spawn_gesture_input(Box::new(tracker), Arc::clone(&signal), CaptureHints::default());
        input.shutdown();

        assert_eq!(input.drain_status(), vec![
            GestureStatus::Initializing,
            GestureStatus::Unavailable(TrackerError::PermissionDenied),
        ]);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert_eq!(signal.mode(), Mode::Assembled);
        assert!(!signal.last_gesture().hand_detected);
    }

    #[test]
    fn shutdown_closes_tracker_exactly_once() {
        let signal = ModeSignal::shared();
        let (tracker, closes) = ScriptedTracker::new(vec![]);

        let mut input = spawn_gesture_input(Box::new(tracker), signal, CaptureHints::default());
        thread::sleep(Duration::from_millis(10));
        input.shutdown();
        input.shutdown();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert_eq!(input.drain_status().last(), Some(&GestureStatus::Stopped));

        drop(input);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_stops_the_worker() {
        let signal = ModeSignal::shared();
        let (tracker, closes) = ScriptedTracker::new(vec![]);
        {
            let _input = spawn_gesture_input(Box::new(tracker), signal, CaptureHints::default());
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn status_labels_name_the_failure() {
        assert_eq!(
            GestureStatus::Unavailable(TrackerError::NotFound).label(),
            "No Camera Found (mouse mode)"
        );
        assert!(GestureStatus::Active { tracker: "x" }.is_active());
        assert!(!GestureStatus::Initializing.is_active());
    }
}
