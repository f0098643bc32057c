//! gesture_tree entry point.

use clap::Parser;
use env_logger::{Builder, Env};
use log::error;

use gesture_tree::{run, AppConfig, Cli};

fn main() {
    Builder::from_env(Env::default().default_filter_or("info")).init();

    let cfg: AppConfig = Cli::parse().into();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║        Gesture Tree — particle tree, hand controlled         ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    #[cfg(feature = "leap")]
    println!("  Trackers: simulated hand, LeapMotion hardware");
    #[cfg(not(feature = "leap"))]
    println!("  Trackers: simulated hand  (use --features leap for hardware)");
    println!("  Gesture backend: {:?}   density: {:.2}", cfg.gesture, cfg.density);
    println!();
    println!("  Click to toggle.  Hold F / P / O for fist / pinch / palm.");
    println!("  Escape or Q quits.");
    println!();

    if let Err(e) = run(cfg) {
        error!("{}", e);
        std::process::exit(1);
    }
}
