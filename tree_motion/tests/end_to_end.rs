//! Whole-engine runs: signal writers on one side, animators on the other.

use std::sync::Arc;
use std::thread;

use glam::Vec2;
use tree_formation::Role;
use tree_motion::{
    apply_observation, Direction, FrameInput, GroupAnimator, HandLandmarks, Material, Mode,
    ModeSignal, ParticleGroup, LANDMARK_COUNT,
};

const FPS: usize = 60;
const DT:  f32   = 1.0 / FPS as f32;

fn tree_groups() -> Vec<GroupAnimator> {
    [
        (400, Role::Foliage,  0.08, Direction::CounterClockwise),
        (100, Role::Ornament, 0.12, Direction::Clockwise),
        (200, Role::Ribbon,   0.05, Direction::Clockwise),
    ]
    .into_iter()
    .map(|(count, role, base_scale, direction)| {
        GroupAnimator::new(
            ParticleGroup { count, role, base_scale, direction },
            Material::for_role(role, 0xFFFFFF),
        )
    })
    .collect()
}

fn run(groups: &mut [GroupAnimator], signal: &ModeSignal, frames: usize, elapsed: &mut f32) {
    for _ in 0..frames {
        *elapsed += DT;
        let snapshot = signal.snapshot();
        for g in groups.iter_mut() {
            g.step(&FrameInput { delta: DT, elapsed: *elapsed, signal: snapshot });
        }
    }
}

#[test]
fn five_seconds_each_way() {
    let signal = ModeSignal::new();
    let mut groups = tree_groups();
    let mut elapsed = 0.0;

    signal.set_mode(Mode::Exploded);
    run(&mut groups, &signal, 5 * FPS, &mut elapsed);
    for g in &groups {
        assert!(g.blend_factor() > 0.99, "{} blend {}", g.group().role.name(), g.blend_factor());
    }

    signal.set_mode(Mode::Assembled);
    run(&mut groups, &signal, 5 * FPS, &mut elapsed);
    for g in &groups {
        assert!(g.blend_factor() < 0.01, "{} blend {}", g.group().role.name(), g.blend_factor());
    }
}

#[test]
fn click_toggle_drives_every_group() {
    let signal = ModeSignal::new();
    let mut groups = tree_groups();
    let mut elapsed = 0.0;

    signal.toggle_mode();
    run(&mut groups, &signal, 30, &mut elapsed);
    let mid: Vec<f32> = groups.iter().map(|g| g.blend_factor()).collect();
    assert!(mid.iter().all(|&b| b > 0.5));

    signal.toggle_mode();
    run(&mut groups, &signal, 30, &mut elapsed);
    for (g, before) in groups.iter().zip(mid) {
        assert!(g.blend_factor() < before);
    }
}

#[test]
fn counter_rotating_layers() {
    let signal = ModeSignal::new();
    let mut groups = tree_groups();
    let mut elapsed = 0.0;
    run(&mut groups, &signal, FPS, &mut elapsed);

    assert!(groups[0].rotation_angle() > 0.0);
    assert!(groups[1].rotation_angle() < 0.0);
    assert!(groups[2].rotation_angle() < 0.0);
    // Ornaments spin on the faster tier.
    assert!(groups[1].rotation_angle().abs() > groups[0].rotation_angle().abs());
}

#[test]
fn gesture_thread_and_render_lane_share_the_signal() {
    let signal = ModeSignal::shared();

    let palm = {
        let center = Vec2::new(0.8, 0.5);
        let wrist  = center + Vec2::new(0.0, 0.1);
        let mut pts = [center; LANDMARK_COUNT];
        pts[0] = wrist;
        for (k, tip) in [8usize, 12, 16, 20].into_iter().enumerate() {
            pts[tip] = wrist + Vec2::new(-0.15 + 0.1 * k as f32, -0.4);
        }
        pts[4] = pts[8] + Vec2::new(0.2, 0.0);
        HandLandmarks::new(pts)
    };

    let writer = {
        let signal = Arc::clone(&signal);
        thread::spawn(move || {
            for _ in 0..200 {
                apply_observation(&signal, Some(&palm));
            }
        })
    };

    let mut groups = tree_groups();
    let mut elapsed = 0.0;
    run(&mut groups, &signal, 120, &mut elapsed);
    writer.join().expect("gesture writer panicked");

    assert_eq!(signal.mode(), Mode::Exploded);
    assert!(signal.steering_offset() > 0.0);
    run(&mut groups, &signal, 240, &mut elapsed);
    for g in &groups {
        assert!(g.blend_factor() > 0.9);
    }
}

#[test]
fn empty_group_alongside_full_ones() {
    let signal = ModeSignal::new();
    let mut groups = tree_groups();
    groups.push(GroupAnimator::new(
        ParticleGroup { count: 0, role: Role::Ribbon, base_scale: 0.05, direction: Direction::Clockwise },
        Material::for_role(Role::Ribbon, 0xFFFFFF),
    ));
    let mut elapsed = 0.0;
    signal.set_mode(Mode::Exploded);
    run(&mut groups, &signal, 10, &mut elapsed);
    let empty = groups.last().expect("pushed above");
    assert_eq!(empty.batch().written_last_update(), 0);
    assert!(groups[0].batch().written_last_update() == 400);
}
