//! Instanced draw batch: the animator's output toward the renderer.
//!
//! One batch per particle group: a flat array of per-instance transforms and
//! one shared [`Material`].  The renderer reads the transforms whenever the
//! batch is dirty; the animator marks it dirty every frame.

use glam::{Mat4, Quat, Vec3};
use tree_formation::Role;

// ════════════════════════════════════════════════════════════════════════════
// InstanceTransform
// ════════════════════════════════════════════════════════════════════════════

/// Position, orientation and uniform scale of one particle instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InstanceTransform {
    pub translation: Vec3,
    pub rotation:    Quat,
    pub scale:       f32,
}

impl Default for InstanceTransform {
    fn default() -> Self {
        InstanceTransform {
            translation: Vec3::ZERO,
            rotation:    Quat::IDENTITY,
            scale:       1.0,
        }
    }
}

impl InstanceTransform {
    /// Column-major model matrix for the GPU instance buffer.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(Vec3::splat(self.scale), self.rotation, self.translation)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Material
// ════════════════════════════════════════════════════════════════════════════

/// Shared surface description for every instance in a batch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    /// Base colour, `0xRRGGBB`.  Also used as the emissive colour.
    pub color:              u32,
    pub emissive_intensity: f32,
    pub roughness:          f32,
    pub metalness:          f32,
    pub transparent:        bool,
    pub opacity:            f32,
}

impl Material {
    /// The house material for a role in the given colour.
    pub fn for_role(role: Role, color: u32) -> Self {
        let (roughness, metalness) = match role {
            Role::Foliage => (0.4, 0.6),
            Role::Ornament | Role::Ribbon => (0.1, 0.9),
        };
        let emissive_intensity = match role {
            Role::Foliage  => 0.13,
            Role::Ornament => 0.5,
            Role::Ribbon   => 0.8,
        };
        let transparent = role == Role::Ribbon;
        Material {
            color,
            emissive_intensity,
            roughness,
            metalness,
            transparent,
            opacity: if transparent { 0.9 } else { 1.0 },
        }
    }

    /// Colour channels as `[r, g, b]` in `0.0..=1.0`.
    pub fn rgb(&self) -> [f32; 3] {
        rgb_channels(self.color)
    }
}

/// `0xRRGGBB` unpacked to `[r, g, b]` in `0.0..=1.0`.  The top byte is ignored.
pub fn rgb_channels(color: u32) -> [f32; 3] {
    [
        ((color >> 16) & 0xFF) as f32 / 255.0,
        ((color >>  8) & 0xFF) as f32 / 255.0,
        ( color        & 0xFF) as f32 / 255.0,
    ]
}

// ════════════════════════════════════════════════════════════════════════════
// InstanceBatch
// ════════════════════════════════════════════════════════════════════════════

/// Per-group instance buffer with a dirty flag.
#[derive(Clone, Debug)]
pub struct InstanceBatch {
    transforms: Vec<InstanceTransform>,
    material:   Material,
    dirty:      bool,
    /// Instance writes performed by the most recent update.
    written:    usize,
}

impl InstanceBatch {
    pub fn new(count: usize, material: Material) -> Self {
        InstanceBatch {
            transforms: vec![InstanceTransform::default(); count],
            material,
            dirty:      false,
            written:    0,
        }
    }

    pub fn len(&self) -> usize { self.transforms.len() }
    pub fn is_empty(&self) -> bool { self.transforms.is_empty() }

    pub fn transforms(&self) -> &[InstanceTransform] { &self.transforms }
    pub fn material(&self)   -> &Material            { &self.material }
    pub fn is_dirty(&self)   -> bool                 { self.dirty }

    /// Number of instance transforms written by the last update.
    pub fn written_last_update(&self) -> usize { self.written }

    /// Mutable access for a full rewrite.  Marks the batch dirty and records
    /// every instance as written.
    pub fn begin_write(&mut self) -> &mut [InstanceTransform] {
        self.written = self.transforms.len();
        self.dirty   = true;
        &mut self.transforms
    }

    /// Renderer side: returns whether an upload is needed and clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
