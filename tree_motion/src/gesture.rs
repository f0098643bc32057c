//! Hand-gesture rule: 21 landmarks → FIST / PALM / UNKNOWN.
//!
//! Landmarks follow the common 21-point hand topology (wrist, then four
//! joints per digit from thumb to pinky), in normalized image coordinates.
//!
//! | Measure | Definition |
//! |---|---|
//! | pinch    | distance thumb tip ↔ index tip |
//! | openness | mean distance wrist ↔ {index, middle, ring, pinky} tips |
//!
//! Rule, first match wins:
//!
//! | Condition | Label | Signal effect |
//! |---|---|---|
//! | pinch < 0.05 or openness < 0.20 | FIST    | mode ← ASSEMBLED, steering ← 0 |
//! | openness > 0.35                 | PALM    | mode ← EXPLODED, steering ← f(hand x) |
//! | otherwise                       | UNKNOWN | steering ← 0 |

use glam::Vec2;
use log::debug;

use crate::error::{MotionError, Result};
use crate::signal::{GestureLabel, GestureReading, Mode, ModeSignal};

/// Points per hand observation.
pub const LANDMARK_COUNT: usize = 21;

/// Fixed landmark positions.
pub mod landmark {
    pub const WRIST:      usize = 0;
    pub const THUMB_TIP:  usize = 4;
    pub const INDEX_TIP:  usize = 8;
    /// Middle-finger knuckle; used as the hand centre.
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_TIP:   usize = 16;
    pub const PINKY_TIP:  usize = 20;

    pub const FINGER_TIPS: [usize; 4] = [INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];
}

pub const PINCH_THRESHOLD: f32 = 0.05;
pub const FIST_OPENNESS:   f32 = 0.20;
pub const PALM_OPENNESS:   f32 = 0.35;
/// Steering offset at full deflection (hand at the image edge).
pub const STEERING_SCALE:  f32 = 0.05;

// ════════════════════════════════════════════════════════════════════════════
// HandLandmarks
// ════════════════════════════════════════════════════════════════════════════

/// One hand observation: exactly [`LANDMARK_COUNT`] normalized points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandLandmarks([Vec2; LANDMARK_COUNT]);

impl HandLandmarks {
    pub fn new(points: [Vec2; LANDMARK_COUNT]) -> Self { HandLandmarks(points) }

    pub fn pinch_distance(&self) -> f32 {
        self.0[landmark::THUMB_TIP].distance(self.0[landmark::INDEX_TIP])
    }

    pub fn openness(&self) -> f32 {
        let wrist = self.0[landmark::WRIST];
        landmark::FINGER_TIPS.iter()
            .map(|&i| self.0[i].distance(wrist))
            .sum::<f32>() / landmark::FINGER_TIPS.len() as f32
    }

    pub fn center(&self) -> Vec2 { self.0[landmark::MIDDLE_MCP] }
}

impl TryFrom<&[Vec2]> for HandLandmarks {
    type Error = MotionError;

    fn try_from(points: &[Vec2]) -> Result<Self> {
        let arr: [Vec2; LANDMARK_COUNT] = points.try_into()
            .map_err(|_| MotionError::LandmarkCount {
                expected: LANDMARK_COUNT,
                actual:   points.len(),
            })?;
        Ok(HandLandmarks(arr))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Classification
// ════════════════════════════════════════════════════════════════════════════

/// Result of classifying one hand.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Classification {
    pub label:          GestureLabel,
    pub pinch_distance: f32,
    pub openness:       f32,
    pub hand_center:    Vec2,
}

/// The decision rule on precomputed measures.
pub fn label_for(pinch_distance: f32, openness: f32) -> GestureLabel {
    if pinch_distance < PINCH_THRESHOLD || openness < FIST_OPENNESS {
        GestureLabel::Fist
    } else if openness > PALM_OPENNESS {
        GestureLabel::Palm
    } else {
        GestureLabel::Unknown
    }
}

pub fn classify(hand: &HandLandmarks) -> Classification {
    let pinch_distance = hand.pinch_distance();
    let openness       = hand.openness();
    Classification {
        label: label_for(pinch_distance, openness),
        pinch_distance,
        openness,
        hand_center: hand.center(),
    }
}

/// Steering offset for an open palm at horizontal position `x ∈ [0, 1]`.
/// Zero at the image centre, ±[`STEERING_SCALE`] at the edges.
pub fn steering_for(x: f32) -> f32 {
    ((x - 0.5) * 2.0).clamp(-1.0, 1.0) * STEERING_SCALE
}

// ════════════════════════════════════════════════════════════════════════════
// Signal update
// ════════════════════════════════════════════════════════════════════════════

/// Apply one camera frame's observation to the signal.
///
/// `None` means the frame arrived but held no hand.  When no new frame has
/// arrived at all, do not call this: the previous reading and steering stay.
pub fn apply_observation(signal: &ModeSignal, hand: Option<&HandLandmarks>) -> Option<Classification> {
    let Some(hand) = hand else {
        signal.record_hand_lost();
        signal.set_steering_offset(0.0);
        return None;
    };

    let c = classify(hand);
    match c.label {
        GestureLabel::Fist => {
            signal.set_mode(Mode::Assembled);
            signal.set_steering_offset(0.0);
        }
        GestureLabel::Palm => {
            signal.set_mode(Mode::Exploded);
            signal.set_steering_offset(steering_for(c.hand_center.x));
        }
        GestureLabel::Unknown => signal.set_steering_offset(0.0),
    }

    let previous = signal.last_gesture();
    if previous.label != c.label || !previous.hand_detected {
        debug!(
            "gesture {} (pinch {:.3}, openness {:.3})",
            c.label.label(), c.pinch_distance, c.openness
        );
    }
    signal.record_gesture(GestureReading {
        hand_detected: true,
        label:         c.label,
        hand_position: c.hand_center,
    });
    Some(c)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    /// A hand with the wrist at `center + (0, 0.1)`, every fingertip `reach`
    /// from the wrist, and the thumb tip `pinch` from the index tip.
    fn hand(center: Vec2, reach: f32, pinch: f32) -> HandLandmarks {
        let wrist = center + Vec2::new(0.0, 0.1);
        let mut pts = [center; LANDMARK_COUNT];
        pts[landmark::WRIST] = wrist;
        let spread = [-0.3_f32, -0.1, 0.1, 0.3];
        for (k, &tip) in landmark::FINGER_TIPS.iter().enumerate() {
            let dir = Vec2::new(spread[k], -1.0).normalize();
            pts[tip] = wrist + dir * reach;
        }
        pts[landmark::THUMB_TIP] = pts[landmark::INDEX_TIP] + Vec2::new(pinch, 0.0);
        pts[landmark::MIDDLE_MCP] = center;
        HandLandmarks::new(pts)
    }

    #[test_case(0.03, 0.50 => GestureLabel::Fist    ; "pinch overrides openness")]
    #[test_case(0.30, 0.40 => GestureLabel::Palm    ; "open palm")]
    #[test_case(0.30, 0.25 => GestureLabel::Unknown ; "in between")]
    #[test_case(0.30, 0.10 => GestureLabel::Fist    ; "closed hand")]
    #[test_case(0.05, 0.35 => GestureLabel::Unknown ; "thresholds are exclusive")]
    fn decision_rule(pinch: f32, openness: f32) -> GestureLabel {
        label_for(pinch, openness)
    }

    #[test]
    fn measures_come_from_fixed_landmarks() {
        let h = hand(Vec2::new(0.5, 0.5), 0.4, 0.2);
        assert!((h.pinch_distance() - 0.2).abs() < 1e-6);
        assert!((h.openness() - 0.4).abs() < 1e-5);
        assert_eq!(h.center(), Vec2::new(0.5, 0.5));
    }

    #[test]
    fn wrong_landmark_count_is_rejected() {
        let pts = vec![Vec2::ZERO; 20];
        let err = HandLandmarks::try_from(pts.as_slice()).unwrap_err();
        assert_eq!(err, MotionError::LandmarkCount { expected: 21, actual: 20 });
        assert!(HandLandmarks::try_from(vec![Vec2::ZERO; 21].as_slice()).is_ok());
    }

    #[test]
    fn steering_is_clamped_and_centered() {
        assert_eq!(steering_for(0.5), 0.0);
        assert!((steering_for(1.0) - STEERING_SCALE).abs() < 1e-7);
        assert!((steering_for(0.0) + STEERING_SCALE).abs() < 1e-7);
        assert!((steering_for(3.0) - STEERING_SCALE).abs() < 1e-7);
    }

    #[test]
    fn palm_explodes_and_steers() {
        let s = ModeSignal::new();
        let c = apply_observation(&s, Some(&hand(Vec2::new(0.75, 0.5), 0.4, 0.2)));
        assert_eq!(c.map(|c| c.label), Some(GestureLabel::Palm));
        assert_eq!(s.mode(), Mode::Exploded);
        assert!((s.steering_offset() - 0.025).abs() < 1e-6);
        let g = s.last_gesture();
        assert!(g.hand_detected);
        assert_eq!(g.label, GestureLabel::Palm);
        assert_eq!(g.hand_position, Vec2::new(0.75, 0.5));
    }

    #[test]
    fn fist_assembles_and_stops_steering() {
        let s = ModeSignal::new();
        s.set_mode(Mode::Exploded);
        s.set_steering_offset(0.04);
        apply_observation(&s, Some(&hand(Vec2::new(0.9, 0.5), 0.1, 0.2)));
        assert_eq!(s.mode(), Mode::Assembled);
        assert_eq!(s.steering_offset(), 0.0);
        assert_eq!(s.last_gesture().label, GestureLabel::Fist);
    }

    #[test]
    fn unknown_keeps_mode_but_zeroes_steering() {
        let s = ModeSignal::new();
        s.set_mode(Mode::Exploded);
        s.set_steering_offset(0.04);
        apply_observation(&s, Some(&hand(Vec2::new(0.9, 0.5), 0.27, 0.2)));
        assert_eq!(s.mode(), Mode::Exploded);
        assert_eq!(s.steering_offset(), 0.0);
        assert_eq!(s.last_gesture().label, GestureLabel::Unknown);
    }

    #[test]
    fn empty_frame_marks_hand_lost() {
        let s = ModeSignal::new();
        apply_observation(&s, Some(&hand(Vec2::new(0.8, 0.4), 0.4, 0.2)));
        assert!(apply_observation(&s, None).is_none());
        let g = s.last_gesture();
        assert!(!g.hand_detected);
        assert_eq!(g.label, GestureLabel::Palm);
        assert_eq!(s.steering_offset(), 0.0);
        // A lost hand is not a fist: the mode stays.
        assert_eq!(s.mode(), Mode::Exploded);
    }
}
