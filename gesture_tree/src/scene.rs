//! Scene composition: the four particle groups, the topper star and the
//! ambient sparkles.
//!
//! | Group | Colour | Role | Base scale | Spin | Count | Shape |
//! |---|---|---|---|---|---|---|
//! | leaves primary   | `#8170fc` | foliage  | 0.08 | + | 12000 | octahedron  |
//! | leaves secondary | `#c0b2e9` | foliage  | 0.08 | + |  8000 | octahedron  |
//! | ornaments        | `#ffffff` | ornament | 0.12 | − |  1500 | icosahedron |
//! | ribbon           | `#ffffff` | ribbon   | 0.05 | − |  5000 | tetrahedron |
//!
//! The whole tree hangs under a root transform (offset `(0, −1, 0)`, scale
//! 0.9).  The star and sparkles live in world space.

use std::f32::consts::{PI, TAU};

use glam::{Quat, Vec3};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tree_formation::{generate_with, Role};
use tree_motion::{
    ease, motion_clock, Direction, FrameInput, GroupAnimator, Material, Mode, ModeSignal,
    MotionTuning, ParticleGroup, SignalSnapshot,
};

use crate::config::AppConfig;

/// Scene colours, `0xRRGGBB`.
pub mod palette {
    pub const BACKGROUND:     u32 = 0x050103;
    pub const LEAF_PRIMARY:   u32 = 0x8170FC;
    pub const LEAF_SECONDARY: u32 = 0xC0B2E9;
    pub const ORNAMENT:       u32 = 0xFFFFFF;
    pub const RIBBON:         u32 = 0xFFFFFF;
    pub const GOLD:           u32 = 0xFFF0C0;
    pub const SPARKLE:        u32 = 0xC0B2E9;
}

// ════════════════════════════════════════════════════════════════════════════
// Groups
// ════════════════════════════════════════════════════════════════════════════

/// Instance geometry.  The software visualizer only uses its footprint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Octahedron,
    Icosahedron,
    Tetrahedron,
}

impl Shape {
    /// Apparent size of a unit instance relative to a unit sphere.
    pub fn footprint(self) -> f32 {
        match self {
            Shape::Octahedron  => 0.9,
            Shape::Icosahedron => 1.0,
            Shape::Tetrahedron => 0.75,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroupConfig {
    pub name:       &'static str,
    pub count:      usize,
    pub role:       Role,
    pub color:      u32,
    pub shape:      Shape,
    pub base_scale: f32,
    pub direction:  Direction,
}

impl GroupConfig {
    /// Same group with its count multiplied by `density`.
    pub fn scaled(self, density: f32) -> Self {
        let count = (self.count as f32 * density.max(0.0)).round() as usize;
        GroupConfig { count, ..self }
    }

    pub fn particle_group(&self) -> ParticleGroup {
        ParticleGroup {
            count:      self.count,
            role:       self.role,
            base_scale: self.base_scale,
            direction:  self.direction,
        }
    }

    pub fn material(&self) -> Material {
        Material::for_role(self.role, self.color)
    }
}

/// The four groups of the full tree.
pub fn default_groups() -> [GroupConfig; 4] {
    use Direction::{Clockwise as Cw, CounterClockwise as Ccw};
    [
        GroupConfig { name: "leaves primary",   count: 12_000, role: Role::Foliage,  color: palette::LEAF_PRIMARY,   shape: Shape::Octahedron,  base_scale: 0.08, direction: Ccw },
        GroupConfig { name: "leaves secondary", count:  8_000, role: Role::Foliage,  color: palette::LEAF_SECONDARY, shape: Shape::Octahedron,  base_scale: 0.08, direction: Ccw },
        GroupConfig { name: "ornaments",        count:  1_500, role: Role::Ornament, color: palette::ORNAMENT,       shape: Shape::Icosahedron, base_scale: 0.12, direction: Cw  },
        GroupConfig { name: "ribbon",           count:  5_000, role: Role::Ribbon,   color: palette::RIBBON,         shape: Shape::Tetrahedron, base_scale: 0.05, direction: Cw  },
    ]
}

/// Transform applied to every particle group.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RootTransform {
    pub offset: Vec3,
    pub scale:  f32,
}

impl Default for RootTransform {
    fn default() -> Self {
        RootTransform { offset: Vec3::new(0.0, -1.0, 0.0), scale: 0.9 }
    }
}

impl RootTransform {
    pub fn apply(&self, local: Vec3) -> Vec3 {
        local * self.scale + self.offset
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Topper star
// ════════════════════════════════════════════════════════════════════════════

pub const TOPPER_HEIGHT: f32 = 3.6;
pub const TOPPER_BOB:    f32 = 0.1;
/// Spin about the vertical axis, rad/s.
pub const TOPPER_SPIN:   f32 = 0.5;
pub const TOPPER_EASE:   f32 = 3.0;
pub const STAR_POINTS:   usize = 5;
pub const STAR_OUTER:    f32 = 0.5;
pub const STAR_INNER:    f32 = 0.22;

/// The gold star above the tree.  Shrinks away when the tree explodes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Topper {
    pub position: Vec3,
    pub spin:     f32,
    pub scale:    f32,
}

impl Default for Topper {
    fn default() -> Self {
        Topper { position: Vec3::new(0.0, TOPPER_HEIGHT, 0.0), spin: 0.0, scale: 1.0 }
    }
}

impl Topper {
    /// `clock` is the folded procedural clock, not raw session time.
    pub fn step(&mut self, delta: f32, clock: f32, mode: Mode) {
        self.position.y = TOPPER_HEIGHT + clock.sin() * TOPPER_BOB;
        self.spin       = (self.spin + delta.max(0.0) * TOPPER_SPIN).rem_euclid(TAU);
        let target = match mode {
            Mode::Assembled => 1.0,
            Mode::Exploded  => 0.0,
        };
        self.scale = ease(self.scale, target, delta, TOPPER_EASE);
    }

    /// Star outline in world space, alternating outer and inner vertices,
    /// starting at the top point.
    pub fn outline(&self) -> [Vec3; STAR_POINTS * 2] {
        let spin = Quat::from_rotation_y(self.spin);
        std::array::from_fn(|k| {
            let r = if k % 2 == 0 { STAR_OUTER } else { STAR_INNER };
            let a = k as f32 * PI / STAR_POINTS as f32;
            let local = Vec3::new(-a.sin() * r, a.cos() * r, 0.0);
            self.position + spin * (local * self.scale)
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Sparkles
// ════════════════════════════════════════════════════════════════════════════

pub const SPARKLE_COUNT: usize = 500;
/// Edge of the cube the sparkles fill.
pub const SPARKLE_SPAN:  f32 = 20.0;
pub const SPARKLE_SPEED: f32 = 0.2;
const SPARKLE_DRIFT:     f32 = 0.4;

/// Ambient glitter.  Positions are a pure function of the seed and time.
#[derive(Clone, Debug)]
pub struct Sparkles {
    base:    Vec<Vec3>,
    phase:   Vec<f32>,
    elapsed: f32,
}

impl Sparkles {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Self {
        let half = SPARKLE_SPAN / 2.0;
        let base = (0..count)
            .map(|_| Vec3::new(
                rng.random_range(-half..half),
                rng.random_range(-half..half),
                rng.random_range(-half..half),
            ))
            .collect();
        let phase = (0..count).map(|_| rng.random::<f32>() * TAU).collect();
        Sparkles { base, phase, elapsed: 0.0 }
    }

    pub fn len(&self) -> usize { self.base.len() }
    pub fn is_empty(&self) -> bool { self.base.is_empty() }

    pub fn set_time(&mut self, elapsed: f32) {
        self.elapsed = elapsed;
    }

    /// Position and brightness (`0..=1`) of every sparkle.
    pub fn points(&self) -> impl Iterator<Item = (Vec3, f32)> + '_ {
        let t = self.elapsed * SPARKLE_SPEED;
        self.base.iter().zip(&self.phase).map(move |(&p, &ph)| {
            let drift = Vec3::new(
                (t + ph).sin(),
                (t * 1.5 + ph * 2.0).sin(),
                (t * 0.5 + ph * 3.0).cos(),
            ) * SPARKLE_DRIFT;
            let twinkle = 0.5 + 0.5 * (self.elapsed * 2.0 + ph).sin();
            (p + drift, twinkle)
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Scene
// ════════════════════════════════════════════════════════════════════════════

pub struct SceneGroup {
    pub config:   GroupConfig,
    pub animator: GroupAnimator,
}

/// Everything that moves, advanced once per frame from one signal snapshot.
pub struct Scene {
    groups:   Vec<SceneGroup>,
    topper:   Topper,
    sparkles: Sparkles,
    root:     RootTransform,
    /// Session seconds.  Kept in f64; frames only ever see [`motion_clock`].
    elapsed:  f64,
    snapshot: SignalSnapshot,
}

impl Scene {
    /// Build the default scene at the configured density.
    pub fn from_config(cfg: &AppConfig) -> tree_motion::Result<Self> {
        let groups: Vec<GroupConfig> = default_groups()
            .into_iter()
            .map(|g| g.scaled(cfg.density))
            .collect();
        Scene::tuned(&groups, cfg.seed, cfg.tuning)
    }

    /// Build a scene from explicit groups.  A seed makes formations and
    /// sparkles reproducible.
    pub fn new(configs: &[GroupConfig], seed: Option<u64>) -> tree_motion::Result<Self> {
        Scene::tuned(configs, seed, MotionTuning::default())
    }

    /// [`Scene::new`] with every group running on `tuning`.
    pub fn tuned(
        configs: &[GroupConfig],
        seed:    Option<u64>,
        tuning:  MotionTuning,
    ) -> tree_motion::Result<Self> {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None    => StdRng::from_rng(&mut rand::rng()),
        };

        let groups = configs
            .iter()
            .map(|&config| {
                let formation = generate_with(&mut rng, config.count, config.role);
                let animator = GroupAnimator::with_formation(
                    config.particle_group(),
                    config.material(),
                    formation,
                )?
                .with_tuning(tuning);
                Ok(SceneGroup { config, animator })
            })
            .collect::<tree_motion::Result<Vec<_>>>()?;

        let sparkles = Sparkles::generate(&mut rng, SPARKLE_COUNT);
        let scene = Scene {
            groups,
            topper: Topper::default(),
            sparkles,
            root: RootTransform::default(),
            elapsed: 0.0,
            snapshot: SignalSnapshot::default(),
        };
        info!("scene built: {} particles in {} groups", scene.total_particles(), scene.groups.len());
        Ok(scene)
    }

    /// Advance by `delta` seconds.  The signal is read exactly once.
    pub fn step(&mut self, delta: f32, signal: &ModeSignal) {
        let delta = delta.max(0.0);
        self.elapsed += f64::from(delta);
        self.snapshot = signal.snapshot();
        let clock = motion_clock(self.elapsed);

        let frame = FrameInput { delta, elapsed: clock, signal: self.snapshot };
        for g in &mut self.groups {
            g.animator.step(&frame);
        }
        self.topper.step(delta, clock, self.snapshot.mode);
        self.sparkles.set_time(clock);
    }

    pub fn groups(&self)   -> &[SceneGroup]   { &self.groups }
    pub fn topper(&self)   -> &Topper         { &self.topper }
    pub fn sparkles(&self) -> &Sparkles       { &self.sparkles }
    pub fn root(&self)     -> &RootTransform  { &self.root }
    pub fn elapsed(&self)  -> f64             { self.elapsed }
    /// The snapshot the last step ran on.
    pub fn snapshot(&self) -> &SignalSnapshot { &self.snapshot }

    pub fn total_particles(&self) -> usize {
        self.groups.iter().map(|g| g.config.count).sum()
    }

    /// Mean blend factor across non-empty groups.
    pub fn blend(&self) -> f32 {
        let live: Vec<f32> = self.groups
            .iter()
            .filter(|g| g.config.count > 0)
            .map(|g| g.animator.blend_factor())
            .collect();
        if live.is_empty() { 0.0 } else { live.iter().sum::<f32>() / live.len() as f32 }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
