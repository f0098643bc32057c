//! # tree_motion
//!
//! Real-time choreography for the particle tree.
//!
//! * [`signal`]: the shared mode/steering/gesture state and its
//!   read-once-per-frame snapshot.
//! * [`animator`]: one [`GroupAnimator`] per particle group: eases between
//!   the tree and explode layouts, spins the group, pulses and tumbles each
//!   particle, and writes an [`InstanceBatch`].
//! * [`gesture`]: the 21-landmark FIST / PALM / UNKNOWN rule and its effect
//!   on the signal.
//!
//! ## Frame loop
//!
//! ```rust
//! use tree_motion::{
//!     Direction, FrameInput, GroupAnimator, Material, Mode, ModeSignal, ParticleGroup,
//! };
//! use tree_formation::Role;
//!
//! let signal = ModeSignal::shared();
//! let mut ribbon = GroupAnimator::new(
//!     ParticleGroup { count: 500, role: Role::Ribbon, base_scale: 0.05, direction: Direction::Clockwise },
//!     Material::for_role(Role::Ribbon, 0xFFFFFF),
//! );
//!
//! signal.set_mode(Mode::Exploded);
//! let mut elapsed = 0.0;
//! for _ in 0..60 {
//!     elapsed += 1.0 / 60.0;
//!     ribbon.step(&FrameInput { delta: 1.0 / 60.0, elapsed, signal: signal.snapshot() });
//! }
//! assert!(ribbon.blend_factor() > 0.8);
//! ```

pub mod animator;
pub mod batch;
pub mod error;
pub mod gesture;
pub mod signal;

pub use animator::{
    base_angular_speed, ease, motion_clock, wrap_angle, AnimationState, Direction, FrameInput,
    GroupAnimator, MotionTuning, ParticleGroup, EASE_RATE, MOTION_PERIOD, RATE_EASE, STEERING_GAIN,
};
pub use batch::{rgb_channels, InstanceBatch, InstanceTransform, Material};
pub use error::{MotionError, Result};
pub use gesture::{apply_observation, classify, Classification, HandLandmarks, LANDMARK_COUNT};
pub use signal::{GestureLabel, GestureReading, Mode, ModeSignal, SharedSignal, SignalSnapshot};
