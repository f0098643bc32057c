//! Hand trackers: the camera and landmark-model boundary.
//!
//! The gesture lane only sees the [`HandTracker`] trait: open with capture
//! hints, pull frames, close.  Each captured frame carries zero or one hand
//! as 21 normalized landmarks; an empty frame is a normal result, not an
//! error.
//!
//! Two implementations:
//!
//! * [`SimTracker`] (always available) is fed by the visualizer window over a
//!   channel.  Holding a pose key produces a synthetic hand centred on the
//!   mouse, so simulated gestures run through the same classifier as real
//!   ones.
//! * `LeapTracker` (feature `leap`) reads a LeapMotion controller via LeapC.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use glam::Vec2;
use thiserror::Error;
use tree_motion::gesture::landmark;
use tree_motion::{HandLandmarks, LANDMARK_COUNT};

// ════════════════════════════════════════════════════════════════════════════
// Boundary types
// ════════════════════════════════════════════════════════════════════════════

/// Desired capture format.  Trackers treat these as hints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureHints {
    pub width:      u32,
    pub height:     u32,
    pub frame_rate: u32,
}

impl Default for CaptureHints {
    fn default() -> Self {
        CaptureHints { width: 320, height: 240, frame_rate: 30 }
    }
}

/// Failures on the camera / vision path.  None of them is fatal to the app.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    #[error("hand model failed to initialise: {0}")]
    ModelInit(String),

    #[error("camera access was denied")]
    PermissionDenied,

    #[error("no camera found")]
    NotFound,

    #[error("camera error: {0}")]
    Device(String),

    /// One frame could not be processed.  The lane keeps running.
    #[error("hand detection failed: {0}")]
    Detection(String),

    #[error("tracker disconnected")]
    Disconnected,
}

impl TrackerError {
    /// True for errors that only spoil the current frame.
    pub fn is_per_frame(&self) -> bool {
        matches!(self, TrackerError::Detection(_))
    }

    /// Short user-facing label.
    pub fn status_label(&self) -> &'static str {
        match self {
            TrackerError::ModelInit(_)     => "AI Init Failed",
            TrackerError::PermissionDenied => "Camera Denied",
            TrackerError::NotFound         => "No Camera Found",
            TrackerError::Device(_)        => "Camera Error",
            TrackerError::Detection(_)     => "Detection Error",
            TrackerError::Disconnected     => "Tracker Disconnected",
        }
    }
}

/// Outcome of one poll.
#[derive(Clone, Debug, PartialEq)]
pub enum TrackerFrame {
    /// No new frame arrived within the timeout.
    Pending,
    /// A new frame, with the hand found in it, if any.
    Captured {
        /// Monotonic capture time since the tracker opened.
        timestamp: Duration,
        hand:      Option<HandLandmarks>,
    },
}

/// A camera plus hand-landmark model.
pub trait HandTracker: Send + 'static {
    fn name(&self) -> &'static str;

    /// Acquire the device and model.  Called once, on the gesture lane.
    fn open(&mut self, hints: &CaptureHints) -> Result<(), TrackerError>;

    /// Wait up to `timeout` for the next frame.
    fn next_frame(&mut self, timeout: Duration) -> Result<TrackerFrame, TrackerError>;

    /// Release the device and model.  Must be idempotent.
    fn close(&mut self);
}

// ════════════════════════════════════════════════════════════════════════════
// Synthetic hands
// ════════════════════════════════════════════════════════════════════════════

/// Pose of a simulated hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimPose {
    /// Fingers curled in.
    Fist,
    /// Fingers half open, thumb touching the index tip.
    Pinch,
    /// Fingers spread wide.
    Palm,
    /// Fingers half open, no pinch.
    Relaxed,
}

impl SimPose {
    /// Wrist-to-fingertip distance.
    fn reach(self) -> f32 {
        match self {
            SimPose::Fist    => 0.12,
            SimPose::Pinch   => 0.30,
            SimPose::Palm    => 0.42,
            SimPose::Relaxed => 0.28,
        }
    }

    /// Thumb-tip to index-tip distance.
    fn pinch_gap(self) -> f32 {
        if self == SimPose::Pinch { 0.02 } else { 0.15 }
    }
}

/// A 21-point hand in `pose` whose middle knuckle sits at `center`.
pub fn synthetic_hand(pose: SimPose, center: Vec2) -> HandLandmarks {
    let reach = pose.reach();
    let wrist = center + Vec2::new(0.0, reach / 4.0);

    let mut pts = [wrist; LANDMARK_COUNT];

    // Index..pinky fan out upward from the wrist; joint j sits at j/4 reach.
    let spread = [-0.25_f32, 0.0, 0.2, 0.4];
    for (f, &lean) in spread.iter().enumerate() {
        let dir = Vec2::new(lean, -1.0).normalize();
        let base = 5 + f * 4;
        for j in 0..4 {
            pts[base + j] = wrist + dir * reach * (j + 1) as f32 / 4.0;
        }
    }

    // Thumb swings out to the side and ends near the index tip.
    let thumb_dir = Vec2::new(-1.0, -0.4).normalize();
    for j in 0..3 {
        pts[1 + j] = wrist + thumb_dir * reach * 0.2 * (j + 1) as f32;
    }
    pts[landmark::THUMB_TIP] = pts[landmark::INDEX_TIP] + Vec2::new(pose.pinch_gap(), 0.0);

    HandLandmarks::new(pts)
}

// ════════════════════════════════════════════════════════════════════════════
// SimTracker
// ════════════════════════════════════════════════════════════════════════════

/// Raw input from the visualizer window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimHand {
    /// A hand in `pose`, centred at `center` (normalized window coordinates).
    Pose { pose: SimPose, center: Vec2 },
    /// The hand left the frame.
    Lost,
}

/// Tracker fed by [`SimHand`] events; each event is one camera frame.
pub struct SimTracker {
    rx:      Receiver<SimHand>,
    started: Instant,
    last:    Option<Duration>,
    closed:  bool,
}

impl SimTracker {
    pub fn new(rx: Receiver<SimHand>) -> Self {
        SimTracker { rx, started: Instant::now(), last: None, closed: false }
    }

    /// A tracker plus the sender that feeds it.
    pub fn channel() -> (Sender<SimHand>, SimTracker) {
        let (tx, rx) = mpsc::channel();
        (tx, SimTracker::new(rx))
    }

    /// Strictly increasing capture time.
    fn stamp(&mut self) -> Duration {
        let now = self.started.elapsed();
        let ts = match self.last {
            Some(prev) if now <= prev => prev + Duration::from_micros(1),
            _ => now,
        };
        self.last = Some(ts);
        ts
    }
}

impl HandTracker for SimTracker {
    fn name(&self) -> &'static str { "simulated hand" }

    fn open(&mut self, _hints: &CaptureHints) -> Result<(), TrackerError> {
        self.started = Instant::now();
        self.last    = None;
        self.closed  = false;
        Ok(())
    }

    fn next_frame(&mut self, timeout: Duration) -> Result<TrackerFrame, TrackerError> {
        if self.closed {
            return Err(TrackerError::Disconnected);
        }
        let hand = match self.rx.recv_timeout(timeout) {
            Ok(SimHand::Pose { pose, center }) => Some(synthetic_hand(pose, center)),
            Ok(SimHand::Lost)                  => None,
            Err(RecvTimeoutError::Timeout)      => return Ok(TrackerFrame::Pending),
            Err(RecvTimeoutError::Disconnected) => return Err(TrackerError::Disconnected),
        };
        Ok(TrackerFrame::Captured { timestamp: self.stamp(), hand })
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LeapTracker (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Width of the interaction box mapped onto `[0, 1]`, in millimetres.
/// One scale for both axes keeps distances comparable to camera
/// landmarks: a spread hand spans roughly 0.45.
const LEAP_FIELD_MM: f32 = 400.0;
/// Palm height (mm above the device) mapped to the image centre.
const LEAP_CENTER_Y: f32 = 200.0;

/// Projects a LeapMotion joint (mm) into image space.  Joints outside the
/// interaction box pin to its edge so landmarks stay in `[0, 1]`.
#[cfg_attr(not(feature = "leap"), allow(dead_code))]
fn leap_to_image(x: f32, y: f32) -> Vec2 {
    Vec2::new(0.5 + x / LEAP_FIELD_MM, 0.5 - (y - LEAP_CENTER_Y) / LEAP_FIELD_MM)
        .clamp(Vec2::ZERO, Vec2::ONE)
}

/// Sorts a failed LeapC poll by its debug text.  A timeout only means no
/// message arrived in time; anything else is a device fault.
#[cfg_attr(not(feature = "leap"), allow(dead_code))]
fn leap_poll_failure(detail: String) -> Result<TrackerFrame, TrackerError> {
    if detail.contains("Timeout") {
        Ok(TrackerFrame::Pending)
    } else {
        Err(TrackerError::Device(detail))
    }
}

#[cfg(feature = "leap")]
pub use leap::LeapTracker;

#[cfg(feature = "leap")]
mod leap {
    use super::*;
    use leaprs::*;

    /// Gesture source backed by a LeapMotion controller.
    ///
    /// Bones are mapped onto the 21-point topology: the middle metacarpal
    /// base stands in for the wrist, and each digit contributes its
    /// proximal, intermediate and distal joints plus the tip.
    pub struct LeapTracker {
        connection: Option<Connection>,
        started:    Instant,
    }

    impl LeapTracker {
        pub fn new() -> Self {
            LeapTracker { connection: None, started: Instant::now() }
        }
    }

    impl Default for LeapTracker {
        fn default() -> Self { Self::new() }
    }

    fn leap_landmarks(hand: &leaprs::Hand) -> Option<HandLandmarks> {
        let digits: Vec<_> = hand.digits().collect();
        if digits.len() < 5 { return None; }

        let mut pts = [Vec2::splat(0.5); LANDMARK_COUNT];
        let w = digits[2].metacarpal().prev_joint();
        pts[landmark::WRIST] = leap_to_image(w.x, w.y);

        for (f, digit) in digits.iter().take(5).enumerate() {
            let base = 1 + f * 4;
            let a = digit.proximal().prev_joint();
            let b = digit.intermediate().prev_joint();
            let c = digit.distal().prev_joint();
            let d = digit.distal().next_joint();
            pts[base]     = leap_to_image(a.x, a.y);
            pts[base + 1] = leap_to_image(b.x, b.y);
            pts[base + 2] = leap_to_image(c.x, c.y);
            pts[base + 3] = leap_to_image(d.x, d.y);
        }
        Some(HandLandmarks::new(pts))
    }

    impl HandTracker for LeapTracker {
        fn name(&self) -> &'static str { "LeapMotion" }

        fn open(&mut self, _hints: &CaptureHints) -> Result<(), TrackerError> {
            let mut connection = Connection::create(ConnectionConfig::default())
                .map_err(|e| TrackerError::ModelInit(format!("{:?}", e)))?;
            connection.open()
                .map_err(|e| TrackerError::Device(format!("{:?}", e)))?;
            self.connection = Some(connection);
            self.started    = Instant::now();
            Ok(())
        }

        fn next_frame(&mut self, timeout: Duration) -> Result<TrackerFrame, TrackerError> {
            let connection = self.connection.as_mut().ok_or(TrackerError::Disconnected)?;
            let msg = match connection.poll(timeout.as_millis() as u32) {
                Ok(m)  => m,
                Err(e) => return leap_poll_failure(format!("{:?}", e)),
            };
            if let Event::Tracking(frame) = msg.event() {
                let hand = frame.hands().next().and_then(|h| leap_landmarks(&h));
                return Ok(TrackerFrame::Captured { timestamp: self.started.elapsed(), hand });
            }
            Ok(TrackerFrame::Pending)
        }

        fn close(&mut self) {
            self.connection = None;
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use tree_motion::{classify, GestureLabel};

    const WAIT: Duration = Duration::from_millis(200);

    #[test]
    fn synthetic_poses_classify_as_intended() {
        let c = Vec2::new(0.5, 0.5);
        assert_eq!(classify(&synthetic_hand(SimPose::Fist,    c)).label, GestureLabel::Fist);
        assert_eq!(classify(&synthetic_hand(SimPose::Pinch,   c)).label, GestureLabel::Fist);
        assert_eq!(classify(&synthetic_hand(SimPose::Palm,    c)).label, GestureLabel::Palm);
        assert_eq!(classify(&synthetic_hand(SimPose::Relaxed, c)).label, GestureLabel::Unknown);
    }

    #[test]
    fn synthetic_hand_is_centred_on_middle_knuckle() {
        let c = Vec2::new(0.3, 0.6);
        let h = synthetic_hand(SimPose::Palm, c);
        assert!((h.center() - c).length() < 1e-5);
    }

    #[test]
    fn sim_tracker_turns_events_into_frames() {
        let (tx, mut tracker) = SimTracker::channel();
        tracker.open(&CaptureHints::default()).expect("sim open never fails");

        assert_eq!(tracker.next_frame(Duration::from_millis(1)), Ok(TrackerFrame::Pending));

        tx.send(SimHand::Pose { pose: SimPose::Palm, center: Vec2::new(0.7, 0.5) })
            .expect("tracker alive");
        tx.send(SimHand::Lost).expect("tracker alive");

        let first = tracker.next_frame(WAIT).expect("frame");
        let second = tracker.next_frame(WAIT).expect("frame");
        match (first, second) {
            (
                TrackerFrame::Captured { timestamp: t1, hand: Some(_) },
                TrackerFrame::Captured { timestamp: t2, hand: None },
            ) => assert!(t2 > t1),
            other => panic!("unexpected frames {:?}", other),
        }
    }

    #[test]
    fn sim_tracker_reports_disconnect() {
        let (tx, mut tracker) = SimTracker::channel();
        tracker.open(&CaptureHints::default()).expect("sim open never fails");
        drop(tx);
        assert_eq!(tracker.next_frame(WAIT), Err(TrackerError::Disconnected));
    }

    #[test]
    fn closed_sim_tracker_stops_delivering() {
        let (tx, mut tracker) = SimTracker::channel();
        tracker.open(&CaptureHints::default()).expect("sim open never fails");
        tracker.close();
        tracker.close();
        tx.send(SimHand::Lost).expect("receiver still held");
        assert_eq!(tracker.next_frame(WAIT), Err(TrackerError::Disconnected));
    }

    #[test]
    fn leap_joints_outside_the_box_pin_to_the_edge() {
        let centre = leap_to_image(0.0, LEAP_CENTER_Y);
        assert!((centre - Vec2::splat(0.5)).length() < 1e-6);

        for (x, y) in [(-900.0, 700.0), (900.0, -300.0), (250.0, 0.0), (-1e6, 1e6)] {
            let p = leap_to_image(x, y);
            assert!((0.0..=1.0).contains(&p.x), "x out of range for ({}, {}): {}", x, y, p.x);
            assert!((0.0..=1.0).contains(&p.y), "y out of range for ({}, {}): {}", x, y, p.y);
        }
        assert_eq!(leap_to_image(-900.0, 700.0), Vec2::new(0.0, 0.0));
        assert_eq!(leap_to_image(900.0, -300.0), Vec2::new(1.0, 1.0));
    }

    #[test]
    fn leap_poll_timeout_waits_but_other_failures_are_device_errors() {
        assert_eq!(leap_poll_failure("Timeout".into()), Ok(TrackerFrame::Pending));
        assert_eq!(
            leap_poll_failure("NotConnected".into()),
            Err(TrackerError::Device("NotConnected".into())),
        );
        assert_eq!(
            leap_poll_failure("ProtocolError".into()),
            Err(TrackerError::Device("ProtocolError".into())),
        );
    }

    #[test]
    fn each_error_has_its_own_label() {
        let labels = [
            TrackerError::ModelInit("x".into()).status_label(),
            TrackerError::PermissionDenied.status_label(),
            TrackerError::NotFound.status_label(),
            TrackerError::Device("x".into()).status_label(),
        ];
        for (i, a) in labels.iter().enumerate() {
            for b in &labels[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(TrackerError::Detection("x".into()).is_per_frame());
        assert!(!TrackerError::NotFound.is_per_frame());
    }
}
