//! # gesture_tree
//!
//! An interactive particle Christmas tree.  An open palm (or a click) bursts
//! the tree into a sphere cloud that you can spin by moving your hand; a fist
//! or pinch (or another click) pulls it back together.
//!
//! ## Gesture → Action mapping
//!
//! | Gesture | Condition | Action |
//! |---|---|---|
//! | Fist  | mean fingertip reach < 0.20 | assemble, stop steering |
//! | Pinch | thumb tip ↔ index tip < 0.05 | assemble, stop steering |
//! | Open palm | mean fingertip reach > 0.35 | explode, steer by hand x |
//! | Anything else | | stop steering |
//! | Hand leaves the frame | | stop steering, keep the mode |
//! | Left click | anywhere in the window | flip the mode |
//!
//! ## Threads
//!
//! The window and the animation run on the main thread.  The hand tracker
//! lives on a worker thread ([`input`]) and only touches the shared
//! [`tree_motion::ModeSignal`].  If the tracker fails, the tree keeps
//! running on clicks and the status bar says why.
//!
//! ## Feature flags
//!
//! * (default): **Simulation mode**: keyboard + mouse drive a synthetic hand.
//! * `leap`: **Hardware mode**: polls a real LeapMotion controller via LeapC.
//!
//! ### Simulation controls
//!
//! | Input | Effect |
//! |---|---|
//! | hold `F` | fist at the mouse position |
//! | hold `P` | pinch at the mouse position |
//! | hold `O` | open palm at the mouse position |
//! | hold `R` | relaxed hand (no gesture) |
//! | release | hand lost |
//! | left click | toggle mode |
//! | `Escape` / `Q` | quit |

pub mod app;
pub mod config;
pub mod input;
pub mod scene;
pub mod tracker;
pub mod visualizer;

pub use app::{run, AppError, AppState};
pub use config::{AppConfig, Cli, GestureBackend};
