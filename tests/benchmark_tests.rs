//! Performance benchmarks for the room state store

use server::state::RoomState;
use shared::{Movement, Vector3};
use std::collections::HashSet;
use std::time::Instant;

/// Benchmarks name resolution when every player asks for the same name
#[test]
fn benchmark_colliding_name_resolution() {
    let mut state = RoomState::new();
    let players = 500;
    let start = Instant::now();

    for i in 0..players {
        state.create_player(&format!("session-{}", i), Some("Player"));
    }

    let duration = start.elapsed();
    println!(
        "Name resolution: {} colliding players in {:?} ({:.2} μs/player)",
        players,
        duration,
        duration.as_micros() as f64 / players as f64
    );

    let names: HashSet<String> = state
        .iter()
        .filter_map(|(_, player)| player.name.clone())
        .collect();
    assert_eq!(names.len(), players);
    assert!(names.contains("Player"));
    assert!(names.contains("Player (499)"));

    // Should complete in under 5 seconds even in debug builds
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks movement updates across a full room
#[test]
fn benchmark_move_player() {
    let mut state = RoomState::new();
    let ids: Vec<String> = (0..64).map(|i| format!("session-{}", i)).collect();
    for id in &ids {
        state.create_player(id, None);
    }

    let iterations = 100_000;
    let start = Instant::now();

    for i in 0..iterations {
        let movement = Movement {
            position: Vector3::new(i as f32, 0.0, 0.0),
            rotation: Vector3::new(0.0, (i % 360) as f32, 0.0),
        };
        state.move_player(&ids[i % ids.len()], &movement);
    }

    let duration = start.elapsed();
    println!(
        "Movement: {} updates in {:?} ({:.2} ns/update)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(state.take_changed());
    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks snapshot copies used for replication
#[test]
fn benchmark_snapshot() {
    let mut state = RoomState::new();
    for i in 0..64 {
        state.create_player(&format!("session-{}", i), Some("Player"));
    }

    let iterations = 1_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let snapshot = state.snapshot();
        assert_eq!(snapshot.len(), 64);
    }

    let duration = start.elapsed();
    println!(
        "Snapshot: {} copies in {:?} ({:.2} μs/copy)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 2000);
}
