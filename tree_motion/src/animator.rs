//! Particle group animator, the per-frame core.
//!
//! Each group owns its formation, a tiny [`AnimationState`] and an
//! [`InstanceBatch`].  Every frame:
//!
//! 1. `blend` eases toward the mode's endpoint (first-order low-pass).
//! 2. The angular rate eases toward `base · direction + steering · gain`,
//!    and the group angle integrates it.
//! 3. Every particle is lerped between its two layouts, spun about +Y,
//!    scaled by its jitter and pulse, oriented, and written to the batch.
//!
//! Step 3 touches no shared mutable state and runs data-parallel.

use std::f32::consts::{PI, TAU};

use glam::{EulerRot, Quat, Vec3};
use log::debug;
use rayon::prelude::*;
use tree_formation::{generate, FormationPair, Role};

use crate::batch::{InstanceBatch, InstanceTransform, Material};
use crate::error::{MotionError, Result};
use crate::signal::{Mode, SignalSnapshot};

/// Blend easing rate, per second.
pub const EASE_RATE:     f32 = 2.0;
/// Angular-rate easing rate, per second.
pub const RATE_EASE:     f32 = 4.0;
/// Radians per second added per unit of steering offset.
pub const STEERING_GAIN: f32 = 5.0;

// ════════════════════════════════════════════════════════════════════════════
// Group description
// ════════════════════════════════════════════════════════════════════════════

/// Spin direction about +Y.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    CounterClockwise,
    Clockwise,
}

impl Direction {
    pub fn sign(self) -> f32 {
        match self {
            Direction::CounterClockwise =>  1.0,
            Direction::Clockwise        => -1.0,
        }
    }
}

/// Immutable description of one particle group.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleGroup {
    pub count:      usize,
    pub role:       Role,
    pub base_scale: f32,
    pub direction:  Direction,
}

/// Idle spin speed in rad/s.  Ribbon and ornaments run on the faster tier.
pub fn base_angular_speed(role: Role) -> f32 {
    match role {
        Role::Ribbon | Role::Ornament => 0.2,
        Role::Foliage                 => 0.15,
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Procedural motion
// ════════════════════════════════════════════════════════════════════════════

/// Common period of every procedural sinusoid, in seconds.  Pulse,
/// tumble, topper and sparkle frequencies all divide `2π / MOTION_PERIOD`
/// into whole cycles, so a clock reduced modulo it drives the same motion.
pub const MOTION_PERIOD: f64 = 20.0 * std::f64::consts::PI;

/// Session time folded into `[0, MOTION_PERIOD)` so f32 trig keeps
/// sub-frame resolution however long the scene has been running.
pub fn motion_clock(elapsed: f64) -> f32 {
    elapsed.rem_euclid(MOTION_PERIOD) as f32
}

/// Angle folded into `[-π, π)`.  The sign of small angles is kept.
pub fn wrap_angle(angle: f32) -> f32 {
    (angle + PI).rem_euclid(TAU) - PI
}

/// `current` moved toward `target` by `min(1, delta · rate)` of the gap.
/// Frame-rate independent and asymptotic.
pub fn ease(current: f32, target: f32, delta: f32, rate: f32) -> f32 {
    let k = (delta.max(0.0) * rate).min(1.0);
    current + (target - current) * k
}

/// A sinusoidal scale pulse `base + amplitude · sin(frequency · t + phase)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pulse {
    pub base:      f32,
    pub amplitude: f32,
    pub frequency: f32,
}

impl Pulse {
    pub fn at(&self, elapsed: f32, phase: f32) -> f32 {
        self.base + self.amplitude * (self.frequency * elapsed + phase).sin()
    }

    pub fn min(&self) -> f32 { self.base - self.amplitude }
    pub fn max(&self) -> f32 { self.base + self.amplitude }
}

/// Breathing pulse for every role while exploded.
pub const EXPLODED_PULSE: Pulse = Pulse { base: 0.6, amplitude: 0.4, frequency: 2.0 };
/// Twinkle for ornaments and ribbon while assembled.
pub const ACCENT_PULSE:   Pulse = Pulse { base: 0.8, amplitude: 0.4, frequency: 3.0 };

/// Scale multiplier for one particle.  Always strictly positive.
pub fn pulse_factor(role: Role, mode: Mode, elapsed: f32, phase: f32) -> f32 {
    match (mode, role) {
        (Mode::Exploded, _)              => EXPLODED_PULSE.at(elapsed, phase),
        (Mode::Assembled, Role::Foliage) => 1.0,
        (Mode::Assembled, _)             => ACCENT_PULSE.at(elapsed, phase),
    }
}

/// Tumbling orientation.  Foliage and ribbon spin on three axes at
/// different rates; ornaments stay upright.
pub fn orientation(role: Role, elapsed: f32, phase: f32) -> Quat {
    match role {
        Role::Ornament => Quat::IDENTITY,
        Role::Foliage | Role::Ribbon => Quat::from_euler(
            EulerRot::XYZ,
            elapsed * 0.5 + phase,
            elapsed * 0.3 + phase,
            elapsed * 0.1 + phase,
        ),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AnimationState / FrameInput
// ════════════════════════════════════════════════════════════════════════════

/// Smoothed per-group scalars.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationState {
    /// 0 = tree layout, 1 = explode layout.
    pub blend:        f32,
    /// Group rotation about +Y, radians, kept in `[-π, π)`.
    pub angle:        f32,
    /// Smoothed angular velocity, rad/s.
    pub angular_rate: f32,
}

/// Per-frame inputs shared by every animator.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    /// Seconds since the previous frame.
    pub delta:   f32,
    /// Procedural clock in seconds, see [`motion_clock`].
    pub elapsed: f32,
    pub signal:  SignalSnapshot,
}

/// Rates behind the two low-pass filters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionTuning {
    pub ease_rate:     f32,
    pub rate_ease:     f32,
    pub steering_gain: f32,
}

impl Default for MotionTuning {
    fn default() -> Self {
        MotionTuning {
            ease_rate:     EASE_RATE,
            rate_ease:     RATE_EASE,
            steering_gain: STEERING_GAIN,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GroupAnimator
// ════════════════════════════════════════════════════════════════════════════

pub struct GroupAnimator {
    group:     ParticleGroup,
    formation: FormationPair,
    state:     AnimationState,
    batch:     InstanceBatch,
    tuning:    MotionTuning,
}

impl GroupAnimator {
    /// Build a group with a freshly generated formation.
    pub fn new(group: ParticleGroup, material: Material) -> Self {
        let formation = generate(group.count, group.role);
        Self::build(group, material, formation)
    }

    /// Build a group around an existing formation, which must hold exactly
    /// `group.count` particles.
    pub fn with_formation(
        group:     ParticleGroup,
        material:  Material,
        formation: FormationPair,
    ) -> Result<Self> {
        if formation.len() != group.count {
            return Err(MotionError::FormationMismatch {
                expected: group.count,
                actual:   formation.len(),
            });
        }
        Ok(Self::build(group, material, formation))
    }

    fn build(group: ParticleGroup, material: Material, formation: FormationPair) -> Self {
        let mut batch = InstanceBatch::new(group.count, material);
        // Until the first frame, show the assembled tree at base scale.
        for (out, &p) in batch.begin_write().iter_mut().zip(formation.tree()) {
            *out = InstanceTransform {
                translation: p,
                rotation:    Quat::IDENTITY,
                scale:       group.base_scale,
            };
        }
        debug!("{} group ready with {} instances", group.role.name(), group.count);

        GroupAnimator {
            state: AnimationState {
                blend:        0.0,
                angle:        0.0,
                angular_rate: base_angular_speed(group.role) * group.direction.sign(),
            },
            group,
            formation,
            batch,
            tuning: MotionTuning::default(),
        }
    }

    /// Replace the easing rates and steering gain.
    pub fn with_tuning(mut self, tuning: MotionTuning) -> Self {
        self.tuning = tuning;
        self
    }

    // ── per-frame ─────────────────────────────────────────────────────────

    /// Advance the smoothed scalars and rewrite every instance transform.
    pub fn step(&mut self, frame: &FrameInput) {
        if self.group.count == 0 {
            return;
        }

        let dt   = frame.delta.max(0.0);
        let role = self.group.role;
        let st   = &mut self.state;

        st.blend = ease(st.blend, frame.signal.mode.target_blend(), dt, self.tuning.ease_rate);

        let target_rate = base_angular_speed(role) * self.group.direction.sign()
            + frame.signal.steering_offset * self.tuning.steering_gain;
        st.angular_rate = ease(st.angular_rate, target_rate, dt, self.tuning.rate_ease);
        st.angle = wrap_angle(st.angle + st.angular_rate * dt);

        let blend          = st.blend;
        let (sin_r, cos_r) = st.angle.sin_cos();
        let base_scale     = self.group.base_scale;
        let mode           = frame.signal.mode;
        let elapsed        = frame.elapsed;

        let tree    = self.formation.tree();
        let explode = self.formation.explode();
        let phase   = self.formation.phase();
        let jitter  = self.formation.scale_jitter();

        self.batch.begin_write()
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, out)| {
                let p = tree[i].lerp(explode[i], blend);
                let translation = Vec3::new(
                    p.x * cos_r - p.z * sin_r,
                    p.y,
                    p.x * sin_r + p.z * cos_r,
                );
                let scale = base_scale
                    * (0.5 + 0.5 * jitter[i])
                    * pulse_factor(role, mode, elapsed, phase[i]);

                *out = InstanceTransform {
                    translation,
                    rotation: orientation(role, elapsed, phase[i]),
                    scale,
                };
            });
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn group(&self)     -> &ParticleGroup   { &self.group }
    pub fn formation(&self) -> &FormationPair   { &self.formation }
    pub fn state(&self)     -> &AnimationState  { &self.state }
    pub fn batch(&self)     -> &InstanceBatch   { &self.batch }
    pub fn batch_mut(&mut self) -> &mut InstanceBatch { &mut self.batch }

    pub fn tuning(&self)    -> &MotionTuning    { &self.tuning }

    pub fn blend_factor(&self)   -> f32 { self.state.blend }
    pub fn rotation_angle(&self) -> f32 { self.state.angle }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
