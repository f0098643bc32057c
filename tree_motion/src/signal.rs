//! The process-wide mode/input signal.
//!
//! One [`ModeSignal`] is shared (via [`SharedSignal`]) between the render
//! lane and every input source.  Each field has a fixed set of writers:
//!
//! | Field | Writers | Readers |
//! |---|---|---|
//! | `mode`            | click toggler, gesture classifier | animators, overlays |
//! | `steering_offset` | gesture classifier only           | animators           |
//! | `last_gesture`    | gesture classifier only           | overlays            |
//!
//! Writers are unordered relative to each other and the last write wins.
//! Readers take one [`SignalSnapshot`] per frame and use only that.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use glam::Vec2;

// ════════════════════════════════════════════════════════════════════════════
// Mode
// ════════════════════════════════════════════════════════════════════════════

/// Discrete formation preference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Mode {
    #[default]
    Assembled = 0,
    Exploded  = 1,
}

impl Mode {
    pub fn toggled(self) -> Mode {
        match self {
            Mode::Assembled => Mode::Exploded,
            Mode::Exploded  => Mode::Assembled,
        }
    }

    /// Blend endpoint the animators ease toward in this mode.
    pub fn target_blend(self) -> f32 {
        match self {
            Mode::Assembled => 0.0,
            Mode::Exploded  => 1.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Assembled => "ASSEMBLED",
            Mode::Exploded  => "EXPLODED",
        }
    }

    fn from_bits(bits: u8) -> Mode {
        if bits & 1 == 0 { Mode::Assembled } else { Mode::Exploded }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Gesture reading
// ════════════════════════════════════════════════════════════════════════════

/// Discrete hand gesture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GestureLabel {
    Fist,
    Palm,
    #[default]
    Unknown,
}

impl GestureLabel {
    pub fn label(self) -> &'static str {
        match self {
            GestureLabel::Fist    => "FIST",
            GestureLabel::Palm    => "PALM",
            GestureLabel::Unknown => "UNKNOWN",
        }
    }
}

/// Last-known hand reading, for overlays.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureReading {
    pub hand_detected: bool,
    pub label:         GestureLabel,
    /// Hand centre in normalized image coordinates, `[0, 1]²`.
    pub hand_position: Vec2,
}

impl Default for GestureReading {
    fn default() -> Self {
        GestureReading {
            hand_detected: false,
            label:         GestureLabel::Unknown,
            hand_position: Vec2::splat(0.5),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ModeSignal
// ════════════════════════════════════════════════════════════════════════════

/// Everything an animator needs from the signal for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SignalSnapshot {
    pub mode:            Mode,
    pub steering_offset: f32,
    pub gesture:         GestureReading,
}

/// Shared handle to the signal.
pub type SharedSignal = Arc<ModeSignal>;

/// Mode, steering and gesture state written by input sources and read by the
/// render lane.
///
/// `mode` and `steering_offset` are atomics; the gesture reading sits behind
/// a mutex.  A poisoned mutex is recovered, never propagated: a torn reading
/// can only cost one stale frame.
#[derive(Debug)]
pub struct ModeSignal {
    mode:     AtomicU8,
    steering: AtomicU32,
    gesture:  Mutex<GestureReading>,
}

impl Default for ModeSignal {
    fn default() -> Self {
        ModeSignal {
            mode:     AtomicU8::new(Mode::Assembled as u8),
            steering: AtomicU32::new(0.0_f32.to_bits()),
            gesture:  Mutex::new(GestureReading::default()),
        }
    }
}

impl ModeSignal {
    pub fn new() -> Self { Self::default() }

    /// A fresh signal behind an `Arc`, ready to hand to input sources.
    pub fn shared() -> SharedSignal { Arc::new(Self::default()) }

    // ── mode ──────────────────────────────────────────────────────────────

    pub fn mode(&self) -> Mode {
        Mode::from_bits(self.mode.load(Ordering::Acquire))
    }

    pub fn set_mode(&self, mode: Mode) {
        self.mode.store(mode as u8, Ordering::Release);
    }

    /// Flip the mode and return the new value.
    pub fn toggle_mode(&self) -> Mode {
        let prev = self.mode.fetch_xor(1, Ordering::AcqRel);
        Mode::from_bits(prev).toggled()
    }

    // ── steering ──────────────────────────────────────────────────────────

    pub fn steering_offset(&self) -> f32 {
        f32::from_bits(self.steering.load(Ordering::Acquire))
    }

    pub fn set_steering_offset(&self, offset: f32) {
        self.steering.store(offset.to_bits(), Ordering::Release);
    }

    // ── gesture ───────────────────────────────────────────────────────────

    pub fn last_gesture(&self) -> GestureReading {
        *self.gesture.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_gesture(&self, reading: GestureReading) {
        *self.gesture.lock().unwrap_or_else(PoisonError::into_inner) = reading;
    }

    /// Mark the hand as gone while keeping its last label and position.
    pub fn record_hand_lost(&self) {
        self.gesture.lock().unwrap_or_else(PoisonError::into_inner).hand_detected = false;
    }

    // ── snapshot ──────────────────────────────────────────────────────────

    /// Read every field once.  Call this once per frame.
    pub fn snapshot(&self) -> SignalSnapshot {
        SignalSnapshot {
            mode:            self.mode(),
            steering_offset: self.steering_offset(),
            gesture:         self.last_gesture(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
