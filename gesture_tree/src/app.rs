//! Top-level application state machine.
//!
//! `AppState` owns the shared signal and the `Scene`.  It applies clicks,
//! records gesture-lane status and advances the scene each frame; `run`
//! wires it to the window and the gesture worker.

use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Instant;

use log::{info, warn};
use thiserror::Error;
use tree_motion::{GestureLabel, Mode, ModeSignal, MotionError, SharedSignal};

use crate::config::{AppConfig, GestureBackend};
use crate::input::{spawn_gesture_input, GestureInput, GestureStatus};
use crate::scene::Scene;
use crate::tracker::{SimHand, SimTracker};
use crate::visualizer::{FrameControls, Hud, Visualizer};

/// Longest frame step fed to the animators, in seconds.  Keeps a stalled
/// window from snapping the tree across its whole transition.
pub const MAX_FRAME_DELTA: f32 = 0.1;

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

#[derive(Error, Debug)]
pub enum AppError {
    #[error("window error: {0}")]
    Window(#[from] minifb::Error),

    #[error("scene construction failed: {0}")]
    Scene(#[from] MotionError),
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    signal:  SharedSignal,
    scene:   Scene,
    gesture: GestureStatus,
    /// Status-bar text, rebuilt every tick.
    pub status: String,
}

impl AppState {
    pub fn new(cfg: &AppConfig, signal: SharedSignal) -> Result<Self, AppError> {
        let scene = Scene::from_config(cfg)?;
        let gesture = match cfg.gesture {
            GestureBackend::Off => GestureStatus::Disabled,
            _                   => GestureStatus::Initializing,
        };
        let mut app = AppState { signal, scene, gesture, status: String::new() };
        app.status = app.compose_status();
        Ok(app)
    }

    pub fn signal(&self) -> &ModeSignal { &self.signal }
    pub fn scene(&self) -> &Scene { &self.scene }
    pub fn gesture_status(&self) -> &GestureStatus { &self.gesture }

    // ── Input ─────────────────────────────────────────────────────────────

    pub fn handle_controls(&mut self, controls: &FrameControls) {
        if controls.toggle {
            self.handle_click();
        }
    }

    /// A click anywhere flips the mode.
    pub fn handle_click(&mut self) -> Mode {
        let mode = self.signal.toggle_mode();
        info!("click → {}", mode.label());
        mode
    }

    pub fn set_gesture_status(&mut self, status: GestureStatus) {
        if status != self.gesture {
            info!("gesture input: {}", status.label());
            self.gesture = status;
        }
    }

    // ── Per-frame ─────────────────────────────────────────────────────────

    pub fn tick(&mut self, delta: f32) {
        self.scene.step(delta.clamp(0.0, MAX_FRAME_DELTA), &self.signal);
        self.status = self.compose_status();
    }

    fn compose_status(&self) -> String {
        let snap = self.scene.snapshot();
        let hand = if snap.gesture.hand_detected {
            let p = snap.gesture.hand_position;
            format!("{} @ {:.2},{:.2}", snap.gesture.label.label(), p.x, p.y)
        } else if snap.gesture.label != GestureLabel::Unknown {
            format!("{} (no hand)", snap.gesture.label.label())
        } else {
            "NO HAND".to_string()
        };
        format!(
            "{}  {:.2} | {} | {} | {} PARTICLES",
            snap.mode.label(),
            self.scene.blend(),
            hand,
            self.gesture.label(),
            self.scene.total_particles(),
        )
    }

    pub fn hud(&self) -> Hud<'_> {
        let snap = self.scene.snapshot();
        Hud { mode: snap.mode, gesture: snap.gesture, status: &self.status }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Main loop
// ════════════════════════════════════════════════════════════════════════════

/// Start the configured gesture backend.  Returns the sender the window
/// uses to feed a simulated hand, if any.
fn start_gesture(
    cfg:    &AppConfig,
    signal: &SharedSignal,
) -> (Option<Sender<SimHand>>, Option<GestureInput>) {
    let backend = match cfg.gesture {
        GestureBackend::Leap if !cfg!(feature = "leap") => {
            warn!("built without the `leap` feature; using the simulated hand");
            GestureBackend::Sim
        }
        other => other,
    };

    match backend {
        GestureBackend::Off => (None, None),
        GestureBackend::Sim => {
            let (tx, tracker) = SimTracker::channel();
            let input = spawn_gesture_input(Box::new(tracker), Arc::clone(signal), cfg.capture);
            (Some(tx), Some(input))
        }
        GestureBackend::Leap => {
            #[cfg(feature = "leap")]
            {
                let tracker = crate::tracker::LeapTracker::new();
                let input = spawn_gesture_input(Box::new(tracker), Arc::clone(signal), cfg.capture);
                (None, Some(input))
            }
            #[cfg(not(feature = "leap"))]
            {
                (None, None)
            }
        }
    }
}

pub fn run(cfg: AppConfig) -> Result<(), AppError> {
    let signal = ModeSignal::shared();

    // ── Gesture lane (opens the tracker on its own thread) ───────────────
    let (sim_tx, mut gesture) = start_gesture(&cfg, &signal);

    // ── Visualizer (owns the window and the sim hand sender) ─────────────
    let mut vis = Visualizer::new(cfg.width, cfg.height, sim_tx)?;

    // ── App state ─────────────────────────────────────────────────────────
    let mut app = AppState::new(&cfg, Arc::clone(&signal))?;

    // ── Main loop ─────────────────────────────────────────────────────────
    let mut last = Instant::now();
    while vis.is_open() {
        // 1. Window input
        let controls = vis.poll_input();
        if controls.quit { break; }
        app.handle_controls(&controls);

        // 2. Gesture lane status
        if let Some(status) = gesture.as_ref().and_then(GestureInput::poll_status) {
            app.set_gesture_status(status);
        }

        // 3. Per-frame logic
        let now   = Instant::now();
        let delta = (now - last).as_secs_f32().min(MAX_FRAME_DELTA);
        last = now;
        app.tick(delta);

        // 4. Render
        vis.render(app.scene(), delta, &app.hud())?;
    }

    if let Some(input) = gesture.as_mut() {
        input.shutdown();
    }
    info!("session ended after {:.1}s", app.scene().elapsed());
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
