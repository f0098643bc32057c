//! # tree_formation
//!
//! Precomputed particle layouts for the gesture tree.  Every particle group
//! owns one [`FormationPair`]: a *tree* layout (where the particle sits while
//! the tree is assembled) and an *explode* layout (where it drifts to when
//! the tree bursts into a sphere cloud), plus the per-particle seeds that
//! drive all later procedural motion.
//!
//! ## Roles
//!
//! | Role | Tree layout | Explode layout |
//! |---|---|---|
//! | [`Role::Foliage`]  | Fills the cone volume, biased toward the surface | Uniform in a sphere |
//! | [`Role::Ornament`] | Hugs the cone surface                              | Uniform in a sphere |
//! | [`Role::Ribbon`]   | Tapered spiral tube wound outside the cone         | Uniform in a sphere |
//!
//! Randomness is only consumed here.  Once a formation exists, everything
//! that moves it is a pure function of time and the stored seeds.
//!
//! ## Quick start
//!
//! ```rust
//! use tree_formation::{generate, Role};
//!
//! let pair = generate(1_000, Role::Ribbon);
//! assert_eq!(pair.len(), 1_000);
//! assert_eq!(pair.tree().len(), pair.explode().len());
//! ```

use std::f32::consts::{PI, TAU};

use glam::Vec3;
use log::debug;
use rand::Rng;

/// Radius of the sphere the explode layout is sampled from.
pub const EXPLODE_RADIUS: f32 = 25.0;

// ════════════════════════════════════════════════════════════════════════════
// Role
// ════════════════════════════════════════════════════════════════════════════

/// Visual category of a particle group.  Decides the tree-layout rule, and
/// downstream, the motion profile and material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Foliage,
    Ornament,
    Ribbon,
}

impl Role {
    pub fn all() -> [Role; 3] {
        [Role::Foliage, Role::Ornament, Role::Ribbon]
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::Foliage  => "foliage",
            Role::Ornament => "ornament",
            Role::Ribbon   => "ribbon",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Shape parameters
// ════════════════════════════════════════════════════════════════════════════

/// The solid cone that foliage fills and ornaments decorate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConeShape {
    /// Total height; the band is centred on y = 0.
    pub height:        f32,
    pub base_radius:   f32,
    /// Fraction of the base radius lost at the tip.  Kept below 1 so the
    /// tip never collapses to a point.
    pub tip_taper:     f32,
    /// Exponent on the uniform radial sample for foliage.  Values below 1
    /// push particles toward the cone surface.
    pub foliage_bias:  f32,
    /// Ornament radius band as a fraction of the local cone radius.
    pub ornament_min:  f32,
    pub ornament_max:  f32,
}

impl Default for ConeShape {
    fn default() -> Self {
        ConeShape {
            height:       16.0,
            base_radius:  6.0,
            tip_taper:    0.99,
            foliage_bias: 0.4,
            ornament_min: 0.8,
            ornament_max: 1.1,
        }
    }
}

impl ConeShape {
    /// Normalised height (0 at the base, 1 at the tip) for a world `y`,
    /// clamped to the band.
    pub fn normalized_height(&self, y: f32) -> f32 {
        ((y + self.height / 2.0) / self.height).clamp(0.0, 1.0)
    }

    /// Maximum cone radius at world height `y`.
    pub fn radius_at(&self, y: f32) -> f32 {
        self.base_radius * (1.0 - self.normalized_height(y) * self.tip_taper)
    }
}

/// The spiral ribbon wound around the outside of the cone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RibbonShape {
    pub height:          f32,
    /// How far the whole spiral is shifted below the cone's centre.
    pub drop:            f32,
    pub base_radius:     f32,
    /// Fraction of `base_radius` lost by the top of the spiral.
    pub taper:           f32,
    /// Extra radius keeping the spiral clear of the cone surface.
    pub clearance:       f32,
    pub revolutions:     f32,
    /// Tube thickness is `U(tube_min, tube_min + tube_span)` before tapering.
    pub tube_min:        f32,
    pub tube_span:       f32,
    pub tube_taper:      f32,
    pub tube_floor:      f32,
    /// Full width of the uniform vertical jitter.
    pub vertical_jitter: f32,
}

impl Default for RibbonShape {
    fn default() -> Self {
        RibbonShape {
            height:          18.0,
            drop:            2.0,
            base_radius:     8.5,
            taper:           0.95,
            clearance:       1.0,
            revolutions:     3.5,
            tube_min:        0.3,
            tube_span:       0.6,
            tube_taper:      1.7,
            tube_floor:      0.1,
            vertical_jitter: 0.5,
        }
    }
}

impl RibbonShape {
    /// Height of the spiral centreline at fraction `t` (0 = bottom).
    pub fn height_at(&self, t: f32) -> f32 {
        t * self.height - self.height / 2.0 - self.drop
    }

    /// Radius of the spiral centreline at fraction `t`.
    pub fn spiral_radius(&self, t: f32) -> f32 {
        self.base_radius * (1.0 - t * self.taper) + self.clearance
    }

    /// Multiplier on the tube thickness at fraction `t`: thick at the
    /// bottom, thin at the top.
    pub fn tube_scale(&self, t: f32) -> f32 {
        (1.0 - t) * self.tube_taper + self.tube_floor
    }

    /// Innermost radius any ribbon particle can take at fraction `t`.
    pub fn min_radius(&self, t: f32) -> f32 {
        self.spiral_radius(t) - (self.tube_min + self.tube_span) * self.tube_scale(t)
    }
}

/// Every tunable number behind the three layouts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FormationShape {
    pub cone:           ConeShape,
    pub ribbon:         RibbonShape,
    pub explode_radius: f32,
}

impl Default for FormationShape {
    fn default() -> Self {
        FormationShape {
            cone:           ConeShape::default(),
            ribbon:         RibbonShape::default(),
            explode_radius: EXPLODE_RADIUS,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FormationPair
// ════════════════════════════════════════════════════════════════════════════

/// The two blend endpoints and per-particle seeds for one group.
///
/// All four arrays always have the same length; index `i` in every array is
/// the same particle.  The pair is immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct FormationPair {
    tree:         Vec<Vec3>,
    explode:      Vec<Vec3>,
    phase:        Vec<f32>,
    scale_jitter: Vec<f32>,
}

impl FormationPair {
    /// Assemble a pair from prebuilt arrays.  Returns `None` unless all four
    /// have the same length.
    pub fn from_parts(
        tree:         Vec<Vec3>,
        explode:      Vec<Vec3>,
        phase:        Vec<f32>,
        scale_jitter: Vec<f32>,
    ) -> Option<Self> {
        let n = tree.len();
        if explode.len() != n || phase.len() != n || scale_jitter.len() != n {
            return None;
        }
        Some(FormationPair { tree, explode, phase, scale_jitter })
    }

    pub fn len(&self) -> usize { self.tree.len() }
    pub fn is_empty(&self) -> bool { self.tree.is_empty() }

    pub fn tree(&self)         -> &[Vec3] { &self.tree }
    pub fn explode(&self)      -> &[Vec3] { &self.explode }
    /// Phase seeds in `[0, 2π)`.
    pub fn phase(&self)        -> &[f32]  { &self.phase }
    /// Scale seeds in `[0, 1)`.
    pub fn scale_jitter(&self) -> &[f32]  { &self.scale_jitter }
}

// ════════════════════════════════════════════════════════════════════════════
// Generation
// ════════════════════════════════════════════════════════════════════════════

/// Generate a formation for `count` particles of `role` with the thread RNG
/// and default shape.
pub fn generate(count: usize, role: Role) -> FormationPair {
    generate_with(&mut rand::rng(), count, role)
}

/// Generate with an injected RNG and the default shape.
pub fn generate_with<R: Rng + ?Sized>(rng: &mut R, count: usize, role: Role) -> FormationPair {
    FormationShape::default().generate_with(rng, count, role)
}

/// Uniform-by-volume point inside a sphere of `radius` centred on the origin.
///
/// The cube root on the radial draw is what makes the density uniform; a
/// linear radius would crowd the centre.
pub fn random_sphere_point<R: Rng + ?Sized>(rng: &mut R, radius: f32) -> Vec3 {
    let azimuth = rng.random::<f32>() * TAU;
    let polar   = (2.0 * rng.random::<f32>() - 1.0).clamp(-1.0, 1.0).acos();
    let r       = rng.random::<f32>().cbrt() * radius;
    let sin_p   = polar.sin();
    Vec3::new(
        r * sin_p * azimuth.cos(),
        r * sin_p * azimuth.sin(),
        r * polar.cos(),
    )
}

impl FormationShape {
    /// Generate a formation for `count` particles of `role`.
    pub fn generate_with<R: Rng + ?Sized>(
        &self,
        rng:   &mut R,
        count: usize,
        role:  Role,
    ) -> FormationPair {
        let mut tree         = Vec::with_capacity(count);
        let mut explode      = Vec::with_capacity(count);
        let mut phase        = Vec::with_capacity(count);
        let mut scale_jitter = Vec::with_capacity(count);

        for i in 0..count {
            phase.push(rng.random::<f32>() * TAU);
            scale_jitter.push(rng.random::<f32>());
            explode.push(random_sphere_point(rng, self.explode_radius));

            let point = match role {
                Role::Ribbon => self.ribbon_point(rng, i as f32 / count as f32),
                Role::Foliage | Role::Ornament => self.cone_point(rng, role),
            };
            tree.push(point);
        }

        debug!("generated {} {} particles", count, role.name());
        FormationPair { tree, explode, phase, scale_jitter }
    }

    // ── Ribbon ────────────────────────────────────────────────────────────

    fn ribbon_point<R: Rng + ?Sized>(&self, rng: &mut R, t: f32) -> Vec3 {
        let rb = &self.ribbon;

        let angle  = t * TAU * rb.revolutions;
        let radius = rb.spiral_radius(t);

        let tube_radius = (rb.tube_min + rng.random::<f32>() * rb.tube_span) * rb.tube_scale(t);
        let tube_angle  = rng.random::<f32>() * TAU;
        let jitter      = (rng.random::<f32>() - 0.5) * rb.vertical_jitter;

        Vec3::new(
            angle.cos() * radius + tube_angle.cos() * tube_radius,
            rb.height_at(t) + jitter,
            angle.sin() * radius + tube_angle.sin() * tube_radius,
        )
    }

    // ── Foliage / ornaments ───────────────────────────────────────────────

    fn cone_point<R: Rng + ?Sized>(&self, rng: &mut R, role: Role) -> Vec3 {
        let cone = &self.cone;

        let y          = rng.random::<f32>() * cone.height - cone.height / 2.0;
        let max_radius = cone.radius_at(y);

        let r = if role == Role::Ornament {
            let span = cone.ornament_max - cone.ornament_min;
            max_radius * (cone.ornament_min + rng.random::<f32>() * span)
        } else {
            max_radius * rng.random::<f32>().powf(cone.foliage_bias)
        };
        let angle = rng.random::<f32>() * 2.0 * PI;

        Vec3::new(angle.cos() * r, y, angle.sin() * r)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng { StdRng::seed_from_u64(0x5EED) }

    fn horizontal(p: Vec3) -> f32 { (p.x * p.x + p.z * p.z).sqrt() }

    #[test]
    fn all_arrays_match_count() {
        let mut rng = rng();
        for role in Role::all() {
            for count in [0usize, 1, 7, 500] {
                let pair = generate_with(&mut rng, count, role);
                assert_eq!(pair.len(), count);
                assert_eq!(pair.tree().len(), count);
                assert_eq!(pair.explode().len(), count);
                assert_eq!(pair.phase().len(), count);
                assert_eq!(pair.scale_jitter().len(), count);
            }
        }
    }

    #[test]
    fn seeds_in_range() {
        let pair = generate_with(&mut rng(), 2_000, Role::Foliage);
        assert!(pair.phase().iter().all(|&p| (0.0..TAU).contains(&p)));
        assert!(pair.scale_jitter().iter().all(|&s| (0.0..1.0).contains(&s)));
    }

    #[test]
    fn explode_radius_is_volumetric() {
        let n = 20_000;
        let pair = generate_with(&mut rng(), n, Role::Ornament);
        let radii: Vec<f32> = pair.explode().iter()
            .map(|p| p.length() / EXPLODE_RADIUS)
            .collect();

        assert!(radii.iter().all(|&r| r <= 1.0 + 1e-5));

        // P(r < x) = x³ for a uniform ball; a linear radius would give x.
        for x in [0.25_f32, 0.5, 0.75, 0.9] {
            let frac = radii.iter().filter(|&&r| r < x).count() as f32 / n as f32;
            let expected = x * x * x;
            assert!(
                (frac - expected).abs() < 0.015,
                "P(r < {}) = {} but expected ≈ {}", x, frac, expected
            );
        }
    }

    #[test]
    fn explode_layout_ignores_role() {
        let a = generate_with(&mut StdRng::seed_from_u64(9), 100, Role::Foliage);
        let b = generate_with(&mut StdRng::seed_from_u64(9), 100, Role::Ornament);
        assert_eq!(a.explode(), b.explode());
        assert_eq!(a.phase(), b.phase());
    }

    #[test]
    fn ribbon_radius_shrinks_with_height() {
        let n = 5_000;
        let pair = generate_with(&mut rng(), n, Role::Ribbon);

        // Ten buckets over t ∈ [0, 0.95).
        let buckets = 10;
        let limit   = (n as f32 * 0.95) as usize;
        let per     = limit / buckets;
        let means: Vec<f32> = (0..buckets)
            .map(|b| {
                let slice = &pair.tree()[b * per..(b + 1) * per];
                slice.iter().map(|&p| horizontal(p)).sum::<f32>() / per as f32
            })
            .collect();

        for w in means.windows(2) {
            assert!(w[1] < w[0], "bucket means not decreasing: {:?}", means);
        }
        assert!(means[0] > means[buckets - 1]);
    }

    #[test]
    fn ribbon_rises_with_index() {
        let pair = generate_with(&mut rng(), 1_000, Role::Ribbon);
        let shape = RibbonShape::default();
        let first = pair.tree()[0].y;
        let last  = pair.tree()[999].y;
        assert!(last > first);
        assert!(first >= shape.height_at(0.0) - shape.vertical_jitter / 2.0);
    }

    #[test]
    fn ribbon_stays_outside_cone() {
        let shape = FormationShape::default();
        let pair  = shape.generate_with(&mut rng(), 5_000, Role::Ribbon);
        for (i, &p) in pair.tree().iter().enumerate() {
            assert!(
                horizontal(p) > shape.cone.radius_at(p.y),
                "ribbon particle {} at {:?} is inside the cone", i, p
            );
        }
    }

    #[test]
    fn ribbon_min_radius_clears_cone_everywhere() {
        let shape = FormationShape::default();
        for step in 0..=100 {
            let t = step as f32 / 100.0;
            let y_top = shape.ribbon.height_at(t) + shape.ribbon.vertical_jitter / 2.0;
            let y_bot = shape.ribbon.height_at(t) - shape.ribbon.vertical_jitter / 2.0;
            let cone  = shape.cone.radius_at(y_top).max(shape.cone.radius_at(y_bot));
            assert!(shape.ribbon.min_radius(t) > cone, "t = {}", t);
        }
    }

    #[test]
    fn foliage_fills_cone_biased_outward() {
        let shape = FormationShape::default();
        let pair  = shape.generate_with(&mut rng(), 10_000, Role::Foliage);

        let mut outer = 0usize;
        for &p in pair.tree() {
            assert!(p.y >= -8.0 && p.y <= 8.0);
            let rel = horizontal(p) / shape.cone.radius_at(p.y);
            assert!(rel <= 1.0 + 1e-4);
            if rel > 0.5 { outer += 1; }
        }
        // With exponent 0.4, P(rel > 0.5) = 1 − 0.5^2.5 ≈ 0.82.
        let frac = outer as f32 / 10_000.0;
        assert!(frac > 0.78, "only {} of foliage in the outer half", frac);
    }

    #[test]
    fn ornaments_hug_surface() {
        let shape = FormationShape::default();
        let pair  = shape.generate_with(&mut rng(), 2_000, Role::Ornament);
        for &p in pair.tree() {
            let rel = horizontal(p) / shape.cone.radius_at(p.y);
            assert!(rel >= 0.8 - 1e-4 && rel <= 1.1 + 1e-4, "rel = {}", rel);
        }
    }

    #[test]
    fn cone_tip_never_collapses() {
        let cone = ConeShape::default();
        assert!(cone.radius_at(8.0) > 0.0);
        assert!(cone.radius_at(-8.0) > cone.radius_at(0.0));
    }

    #[test]
    fn same_count_groups_get_independent_buffers() {
        let mut rng = rng();
        let a = generate_with(&mut rng, 64, Role::Foliage);
        let b = generate_with(&mut rng, 64, Role::Foliage);
        assert_ne!(a.phase(), b.phase());
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let a = generate_with(&mut StdRng::seed_from_u64(1), 300, Role::Ribbon);
        let b = generate_with(&mut StdRng::seed_from_u64(1), 300, Role::Ribbon);
        pretty_assertions::assert_eq!(a, b);
    }

    #[test]
    fn from_parts_rejects_ragged_arrays() {
        let ok = FormationPair::from_parts(
            vec![Vec3::ZERO; 2], vec![Vec3::ONE; 2], vec![0.0; 2], vec![0.5; 2],
        );
        assert!(ok.is_some());
        let bad = FormationPair::from_parts(
            vec![Vec3::ZERO; 2], vec![Vec3::ONE; 3], vec![0.0; 2], vec![0.5; 2],
        );
        assert!(bad.is_none());
    }
}
