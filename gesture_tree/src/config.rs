//! Runtime configuration and its command-line form.

use clap::{Parser, ValueEnum};
use tree_motion::{MotionTuning, EASE_RATE, STEERING_GAIN};

use crate::tracker::CaptureHints;

/// Which hand tracker feeds the gesture lane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum GestureBackend {
    /// Keyboard + mouse driven synthetic hand.
    #[default]
    Sim,
    /// LeapMotion controller (needs the `leap` feature).
    Leap,
    /// Click input only.
    Off,
}

/// Configuration for the full application.
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    /// Particle count multiplier; 1.0 gives 12000 / 8000 / 1500 / 5000.
    pub density: f32,
    pub gesture: GestureBackend,
    pub width:   usize,
    pub height:  usize,
    pub capture: CaptureHints,
    /// Fixed seed for reproducible formations.
    pub seed:    Option<u64>,
    /// Easing rates and steering gain shared by every group.
    pub tuning:  MotionTuning,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            density: 1.0,
            gesture: GestureBackend::Sim,
            width:   960,
            height:  640,
            capture: CaptureHints::default(),
            seed:    None,
            tuning:  MotionTuning::default(),
        }
    }
}

/// Largest accepted density multiplier.
pub const MAX_DENSITY: f32 = 4.0;

// ── CLI ───────────────────────────────────────────────────────────────────

/// Gesture-driven particle Christmas tree.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Particle count multiplier (0 to 4)
    #[arg(long, default_value_t = 1.0)]
    pub density: f32,

    /// Hand tracker feeding the gesture lane
    #[arg(long, value_enum, default_value_t = GestureBackend::Sim)]
    pub gesture: GestureBackend,

    /// Window width in pixels
    #[arg(long, default_value_t = 960)]
    pub width: usize,

    /// Window height in pixels
    #[arg(long, default_value_t = 640)]
    pub height: usize,

    /// Seed for reproducible formations
    #[arg(long)]
    pub seed: Option<u64>,

    /// Requested camera frame rate
    #[arg(long, default_value_t = 30)]
    pub camera_fps: u32,

    /// How fast the tree bursts and reassembles, per second
    #[arg(long, default_value_t = EASE_RATE)]
    pub ease_rate: f32,

    /// Spin added per unit of hand offset, rad/s
    #[arg(long, default_value_t = STEERING_GAIN)]
    pub steering_gain: f32,
}

/// `value` if it is finite and positive, else `fallback`.
fn positive_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value > 0.0 { value } else { fallback }
}

impl From<Cli> for AppConfig {
    fn from(cli: Cli) -> Self {
        let density = if cli.density.is_finite() {
            cli.density.clamp(0.0, MAX_DENSITY)
        } else {
            1.0
        };
        AppConfig {
            density,
            gesture: cli.gesture,
            width:   cli.width.max(160),
            height:  cli.height.max(120),
            capture: CaptureHints { frame_rate: cli.camera_fps.max(1), ..CaptureHints::default() },
            seed:    cli.seed,
            tuning:  MotionTuning {
                ease_rate:     positive_or(cli.ease_rate, EASE_RATE),
                steering_gain: positive_or(cli.steering_gain, STEERING_GAIN),
                ..MotionTuning::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> AppConfig {
        let argv = std::iter::once("gesture_tree").chain(args.iter().copied());
        Cli::try_parse_from(argv).expect("valid arguments").into()
    }

    #[test]
    fn no_flags_gives_defaults() {
        assert_eq!(parse(&[]), AppConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let cfg = parse(&["--density", "0.5", "--gesture", "off", "--seed", "7", "--width", "800"]);
        assert_eq!(cfg.density, 0.5);
        assert_eq!(cfg.gesture, GestureBackend::Off);
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.width, 800);
        assert_eq!(cfg.height, 640);
    }

    #[test]
    fn density_is_clamped() {
        assert_eq!(parse(&["--density", "9"]).density, MAX_DENSITY);
        assert_eq!(parse(&["--density=-1"]).density, 0.0);
    }

    #[test]
    fn tuning_flags_reach_the_config() {
        let cfg = parse(&["--ease-rate", "6", "--steering-gain", "2.5"]);
        assert_eq!(cfg.tuning.ease_rate, 6.0);
        assert_eq!(cfg.tuning.steering_gain, 2.5);
        assert_eq!(cfg.tuning.rate_ease, MotionTuning::default().rate_ease);
    }

    #[test]
    fn unusable_tuning_falls_back() {
        let cfg = parse(&["--ease-rate=0", "--steering-gain=-3"]);
        assert_eq!(cfg.tuning, MotionTuning::default());
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(Cli::try_parse_from(["gesture_tree", "--gesture", "webcam"]).is_err());
    }
}
