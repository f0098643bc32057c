//! Software-rendered visualizer using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  · ·    ·      sparkles            ·     ·       ·        │
//! │                   ★  topper                               │
//! │                  /█\                                      │
//! │                 /███\   particle tree (additive splats)   │
//! │                /█████\            ○ hand cursor           │
//! │  FIST/PINCH: ASSEMBLE        OPEN HAND: EXPLODE + ROTATE  │
//! │  status bar                                               │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Every instance is drawn as an additive splat, so dense regions bloom
//! without depth sorting.  The camera orbits the tree slowly.

use std::f32::consts::TAU;
use std::sync::mpsc::Sender;
use std::time::Duration;

use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};
use tree_motion::{rgb_channels, GestureLabel, GestureReading, Mode};

use crate::scene::{palette, Scene};
use crate::tracker::{SimHand, SimPose};

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

const STATUS_H:     usize = 22;
const TEXT_SCALE:   usize = 2;
const TEXT_COLOR:   u32   = 0xFFC0B2E9;
const DIM_COLOR:    u32   = 0xFF5A4E7A;
const ACTIVE_COLOR: u32   = 0xFFFFF0C0;
const STATUS_BG:    u32   = 0xFF0E0814;
const CURSOR_PALM:  u32   = 0xFFFF88CC;
const CURSOR_OTHER: u32   = 0xFF8170FC;

/// Base splat brightness before the material's emissive term.
const SPLAT_BASE: f32 = 0.35;

// ════════════════════════════════════════════════════════════════════════════
// Camera
// ════════════════════════════════════════════════════════════════════════════

/// Radians per second of auto-orbit.
pub const AUTO_ROTATE: f32 = 0.0314;

/// Perspective camera circling the origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitCamera {
    pub distance: f32,
    pub height:   f32,
    pub azimuth:  f32,
    /// Vertical field of view, degrees.
    pub fov_deg:  f32,
    pub near:     f32,
    pub far:      f32,
}

impl Default for OrbitCamera {
    /// Starts at `(0, 2, 14)` looking at the origin.
    fn default() -> Self {
        OrbitCamera { distance: 14.0, height: 2.0, azimuth: 0.0, fov_deg: 50.0, near: 0.1, far: 100.0 }
    }
}

/// A point on screen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projected {
    pub x:     f32,
    pub y:     f32,
    /// Distance along the view axis.
    pub depth: f32,
}

impl OrbitCamera {
    pub fn eye(&self) -> Vec3 {
        Vec3::new(self.distance * self.azimuth.sin(), self.height, self.distance * self.azimuth.cos())
    }

    pub fn advance(&mut self, delta: f32) {
        self.azimuth = (self.azimuth + delta.max(0.0) * AUTO_ROTATE).rem_euclid(TAU);
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        let view = Mat4::look_at_rh(self.eye(), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(self.fov_deg.to_radians(), aspect, self.near, self.far);
        proj * view
    }

    /// Pixels per world unit at depth 1.
    pub fn focal_px(&self, height: usize) -> f32 {
        height as f32 / 2.0 / (self.fov_deg.to_radians() / 2.0).tan()
    }

    /// Project a world point onto a `width`×`height` screen.  `None` for
    /// points behind the near plane.
    pub fn project(&self, vp: &Mat4, p: Vec3, width: usize, height: usize) -> Option<Projected> {
        let clip = *vp * p.extend(1.0);
        if clip.w <= self.near {
            return None;
        }
        let ndc = clip.xyz() / clip.w;
        Some(Projected {
            x:     (ndc.x + 1.0) * 0.5 * width as f32,
            y:     (1.0 - ndc.y) * 0.5 * height as f32,
            depth: clip.w,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Canvas
// ════════════════════════════════════════════════════════════════════════════

pub struct Canvas {
    pub buf: Vec<u32>,
    width:   usize,
    height:  usize,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Canvas { buf: vec![0xFF000000 | palette::BACKGROUND; width * height], width, height }
    }

    pub fn width(&self)  -> usize { self.width }
    pub fn height(&self) -> usize { self.height }

    pub fn clear(&mut self, color: u32) {
        self.buf.fill(0xFF000000 | color);
    }

    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        self.buf[y * self.width + x]
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < self.width && y < self.height {
            self.buf[y * self.width + x] = color;
        }
    }

    /// Add `rgb * k` to one pixel, saturating.
    fn add_pixel(&mut self, x: isize, y: isize, rgb: [f32; 3], k: f32) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let i = y as usize * self.width + x as usize;
        self.buf[i] = additive(self.buf[i], rgb, k);
    }

    /// Soft disc of radius `r` pixels.  Sub-pixel splats fade instead of
    /// vanishing.
    pub fn splat(&mut self, x: f32, y: f32, r: f32, rgb: [f32; 3], k: f32) {
        if r < 1.0 {
            self.add_pixel(x as isize, y as isize, rgb, k * r.max(0.25));
            return;
        }
        let ri = r.ceil() as isize;
        let (cx, cy) = (x as isize, y as isize);
        for dy in -ri..=ri {
            for dx in -ri..=ri {
                let d = ((dx * dx + dy * dy) as f32).sqrt();
                if d <= r {
                    self.add_pixel(cx + dx, cy + dy, rgb, k * (1.0 - d / (r + 1.0)));
                }
            }
        }
    }

    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y + h).min(self.height) {
            for col in x..(x + w).min(self.width) {
                self.buf[row * self.width + col] = color;
            }
        }
    }

    pub fn draw_line(&mut self, a: Vec2, b: Vec2, rgb: [f32; 3], k: f32) {
        let steps = (b - a).abs().max_element().ceil().max(1.0) as usize;
        for s in 0..=steps {
            let p = a.lerp(b, s as f32 / steps as f32);
            self.add_pixel(p.x as isize, p.y as isize, rgb, k);
        }
    }

    pub fn draw_ring(&mut self, cx: f32, cy: f32, r: f32, color: u32) {
        let n = (r * 6.0).max(12.0) as usize;
        for i in 0..n {
            let a = i as f32 / n as f32 * std::f32::consts::TAU;
            let (x, y) = (cx + r * a.cos(), cy + r * a.sin());
            if x >= 0.0 && y >= 0.0 {
                self.set_pixel(x as usize, y as usize, color);
            }
        }
    }

    /// 3×5 bitmap text, scaled by [`TEXT_SCALE`].
    pub fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        let advance = 4 * TEXT_SCALE;
        let mut cx = x;
        for ch in text.chars() {
            if cx + advance > self.width { break; }
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.fill_rect(cx + col * TEXT_SCALE, y + row * TEXT_SCALE, TEXT_SCALE, TEXT_SCALE, color);
                    }
                }
            }
            cx += advance;
        }
    }

    pub fn text_width(text: &str) -> usize {
        text.chars().count() * 4 * TEXT_SCALE
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

/// What the window asked for this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameControls {
    /// Left button went down inside the window.
    pub toggle: bool,
    pub quit:   bool,
}

/// Heads-up display contents.
#[derive(Clone, Debug)]
pub struct Hud<'a> {
    pub mode:    Mode,
    pub gesture: GestureReading,
    pub status:  &'a str,
}

pub struct Visualizer {
    window:     Window,
    canvas:     Canvas,
    camera:     OrbitCamera,
    sim_tx:     Option<Sender<SimHand>>,
    mouse_down: bool,
    sim_pose:   Option<SimPose>,
}

impl Visualizer {
    pub fn new(width: usize, height: usize, sim_tx: Option<Sender<SimHand>>) -> Result<Self, minifb::Error> {
        let mut window = Window::new(
            "Gesture Tree — fist to assemble, open hand to explode",
            width, height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;

        window.limit_update_rate(Some(Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            canvas: Canvas::new(width, height),
            camera: OrbitCamera::default(),
            sim_tx,
            mouse_down: false,
            sim_pose: None,
        })
    }

    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Read keyboard and mouse.  Simulated hand frames go to the sim
    /// tracker; clicks and quit requests are returned.
    pub fn poll_input(&mut self) -> FrameControls {
        let mut controls = FrameControls::default();
        if !self.window.is_open()
            || self.window.is_key_pressed(Key::Escape, KeyRepeat::No)
            || self.window.is_key_pressed(Key::Q, KeyRepeat::No)
        {
            controls.quit = true;
            return controls;
        }

        let down   = self.window.get_mouse_down(MouseButton::Left);
        let inside = self.window.get_mouse_pos(MouseMode::Discard).is_some();
        controls.toggle = down && !self.mouse_down && inside;
        self.mouse_down = down;

        self.feed_sim_hand();
        controls
    }

    fn feed_sim_hand(&mut self) {
        let Some(tx) = &self.sim_tx else { return };

        let held = |k: Key| self.window.is_key_down(k);
        let pose = if held(Key::F) {
            Some(SimPose::Fist)
        } else if held(Key::P) {
            Some(SimPose::Pinch)
        } else if held(Key::O) {
            Some(SimPose::Palm)
        } else if held(Key::R) {
            Some(SimPose::Relaxed)
        } else {
            None
        };

        let event = match pose {
            Some(pose) => {
                let (mx, my) = self.window.get_mouse_pos(MouseMode::Clamp).unwrap_or((0.0, 0.0));
                let center = Vec2::new(
                    mx / self.canvas.width() as f32,
                    my / self.canvas.height() as f32,
                );
                Some(SimHand::Pose { pose, center })
            }
            None if self.sim_pose.is_some() => Some(SimHand::Lost),
            None => None,
        };
        self.sim_pose = pose;

        if let Some(event) = event {
            if tx.send(event).is_err() {
                // Tracker side is gone; stop feeding it.
                self.sim_tx = None;
            }
        }
    }

    /// Draw one frame and present it.
    pub fn render(&mut self, scene: &Scene, delta: f32, hud: &Hud) -> Result<(), minifb::Error> {
        self.camera.advance(delta);
        draw_scene(&mut self.canvas, &self.camera, scene);
        draw_hud(&mut self.canvas, hud);
        let (w, h) = (self.canvas.width(), self.canvas.height());
        self.window.update_with_buffer(&self.canvas.buf, w, h)
    }
}

// ── scene pass ────────────────────────────────────────────────────────────

/// Rasterize sparkles, particle groups and the topper into `canvas`.
pub fn draw_scene(canvas: &mut Canvas, camera: &OrbitCamera, scene: &Scene) {
    canvas.clear(palette::BACKGROUND);
    let (w, h) = (canvas.width(), canvas.height());
    let vp    = camera.view_proj(w as f32 / h as f32);
    let focal = camera.focal_px(h);

    let sparkle_rgb = rgb_channels(palette::SPARKLE);
    for (p, twinkle) in scene.sparkles().points() {
        if let Some(s) = camera.project(&vp, p, w, h) {
            canvas.splat(s.x, s.y, 0.6, sparkle_rgb, 0.5 * twinkle);
        }
    }

    let root = scene.root();
    for group in scene.groups() {
        let material  = group.animator.batch().material();
        let rgb       = material.rgb();
        let k         = ((SPLAT_BASE + material.emissive_intensity) * material.opacity).min(1.0);
        let footprint = group.config.shape.footprint() * root.scale;

        for t in group.animator.batch().transforms() {
            let world = root.apply(t.translation);
            if let Some(s) = camera.project(&vp, world, w, h) {
                let r = t.scale * footprint * focal / s.depth;
                canvas.splat(s.x, s.y, r, rgb, k);
            }
        }
    }

    let topper = scene.topper();
    if topper.scale > 0.02 {
        let gold = rgb_channels(palette::GOLD);
        let pts: Vec<Vec2> = topper
            .outline()
            .iter()
            .filter_map(|&p| camera.project(&vp, p, w, h))
            .map(|s| Vec2::new(s.x, s.y))
            .collect();
        for (i, &a) in pts.iter().enumerate() {
            canvas.draw_line(a, pts[(i + 1) % pts.len()], gold, 1.0);
        }
        if let Some(c) = camera.project(&vp, topper.position, w, h) {
            let r = 0.35 * topper.scale * focal / c.depth;
            canvas.splat(c.x, c.y, r, gold, 0.8);
        }
    }
}

// ── HUD pass ──────────────────────────────────────────────────────────────

fn draw_hud(canvas: &mut Canvas, hud: &Hud) {
    let (w, h) = (canvas.width(), canvas.height());

    if hud.gesture.hand_detected {
        let color = if hud.gesture.label == GestureLabel::Palm { CURSOR_PALM } else { CURSOR_OTHER };
        let p = hud.gesture.hand_position;
        canvas.draw_ring(p.x * w as f32, p.y * h as f32, 14.0, color);
    }

    let legend_y = h.saturating_sub(STATUS_H + 18);
    let (assemble, explode) = match hud.mode {
        Mode::Assembled => (ACTIVE_COLOR, DIM_COLOR),
        Mode::Exploded  => (DIM_COLOR, ACTIVE_COLOR),
    };
    canvas.draw_label("FIST/PINCH: ASSEMBLE", 12, legend_y, assemble);
    let right = "OPEN HAND: EXPLODE + ROTATE";
    canvas.draw_label(right, w.saturating_sub(Canvas::text_width(right) + 12), legend_y, explode);

    let bar_y = h.saturating_sub(STATUS_H);
    canvas.fill_rect(0, bar_y, w, STATUS_H, STATUS_BG);
    canvas.draw_label(hud.status, 8, bar_y + 6, TEXT_COLOR);
}

// ────────────────────────────────────────────────────────────────────────────
// Colour helpers
// ────────────────────────────────────────────────────────────────────────────

/// Add `rgb * k` onto an ARGB pixel, saturating each channel.
fn additive(dst: u32, rgb: [f32; 3], k: f32) -> u32 {
    let k = k.max(0.0);
    let add = |shift: u32, c: f32| {
        let base = (dst >> shift) & 0xFF;
        (base + (c * k * 255.0) as u32).min(0xFF) << shift
    };
    0xFF000000 | add(16, rgb[0]) | add(8, rgb[1]) | add(0, rgb[2])
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '(' => [0b010, 0b100, 0b100, 0b100, 0b010],
        ')' => [0b010, 0b001, 0b001, 0b001, 0b010],
        '|' => [0b010, 0b010, 0b010, 0b010, 0b010],
        '@' => [0b111, 0b101, 0b111, 0b100, 0b111],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
