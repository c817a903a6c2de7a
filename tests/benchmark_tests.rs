//! Performance benchmarks for the hot paths of the sync loop

use client::interpolation::{InterpolationBuffer, Sample};
use server::simulation::ServerSimulation;
use shared::math::{slerp_shortest, yaw_rotation};
use shared::{
    HandTransforms, InputRecord, MotionConfig, MotionState, Packet, Vec3, MAX_PACKET_SIZE,
};
use std::time::Instant;

/// Benchmarks a single motion step
#[test]
fn benchmark_motion_step() {
    let motion = MotionConfig::default();
    let mut state = MotionState::at_rest(Vec3::new(0.0, 1.2, 0.0));
    let control = Vec3::new(0.6, 0.0, -0.8);

    let iterations = 100_000;
    let start = Instant::now();

    for i in 0..iterations {
        motion.step(&mut state, control, i % 2 == 0, 1.0 / 60.0);
    }

    let duration = start.elapsed();
    println!(
        "Motion step: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(state.velocity.norm() <= motion.max_speed + 1e-4);
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks a full server tick with a crowded room
#[test]
fn benchmark_server_tick() {
    let mut rng = <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(5);
    let mut simulation = ServerSimulation::default();
    let ids: Vec<String> = (0..64)
        .map(|_| simulation.add_participant(&mut rng).id.clone())
        .collect();

    for (i, id) in ids.iter().enumerate() {
        let angle = i as f32 * 0.1;
        simulation.apply_input(
            id,
            InputRecord {
                thrust: [angle.cos(), 0.0, angle.sin()],
                fast: i % 3 == 0,
                ..InputRecord::default()
            },
        );
    }

    let iterations = 1_000;
    let start = Instant::now();

    for _ in 0..iterations {
        simulation.tick(1.0 / 60.0);
    }

    let duration = start.elapsed();
    println!(
        "Server tick (64 participants): {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 2000);
}

/// Benchmarks snapshot encoding and checks it fits one datagram
#[test]
fn benchmark_snapshot_encoding() {
    let mut rng = <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(6);
    let mut simulation = ServerSimulation::default();
    let ids: Vec<String> = (0..32)
        .map(|_| simulation.add_participant(&mut rng).id.clone())
        .collect();
    for id in &ids {
        simulation.apply_input(
            id,
            InputRecord {
                controllers: Some(HandTransforms::desktop_fallback()),
                ..InputRecord::default()
            },
        );
    }

    let packet = Packet::Snapshot(simulation.snapshot(shared::now_ms()));
    let size = bincode::serialized_size(&packet).unwrap() as usize;
    println!("Snapshot with 32 participants: {} bytes", size);
    assert!(size <= MAX_PACKET_SIZE);

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let bytes = packet.encode().unwrap();
        assert_eq!(bytes.len(), size);
    }

    let duration = start.elapsed();
    println!(
        "Snapshot encoding: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 2000);
}

/// Benchmarks remote pose reconstruction from a full buffer
#[test]
fn benchmark_interpolation_sampling() {
    let mut buffer = InterpolationBuffer::new();
    for i in 0..10u64 {
        buffer.push(Sample {
            t: i * 50,
            position: Vec3::new(i as f32, 1.2, 0.0),
            orientation: Some(yaw_rotation(i as f32 * 0.2)),
        });
    }

    let iterations = 20_000;
    let start = Instant::now();

    for i in 0..iterations {
        let render_time = (i % 500) as f64;
        let pose = buffer.sample_at(render_time).unwrap();
        assert!(pose.position.x.is_finite());
    }

    let duration = start.elapsed();
    println!(
        "Interpolation sampling: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 2000);
}

/// Benchmarks shortest-arc slerp
#[test]
fn benchmark_slerp() {
    let a = yaw_rotation(0.0);
    let b = yaw_rotation(2.5);

    let iterations = 100_000;
    let start = Instant::now();

    let mut last = a;
    for i in 0..iterations {
        last = slerp_shortest(&a, &b, (i % 100) as f32 / 100.0);
    }

    let duration = start.elapsed();
    println!(
        "Slerp: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(last.angle() <= 2.5 + 1e-4);
    assert!(duration.as_millis() < 1000);
}
