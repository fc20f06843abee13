use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use roborace::board::layouts::practice_course;
use roborace::board::{Board, Direction, Position, RobotId};
use roborace::player::PlayerId;
use roborace::priority::PriorityResolver;
use roborace::selfplay::{play_game, SelfPlayConfig};

/// The practice course with six robots spread over the course.
fn crowded_course() -> Board {
    let mut board = practice_course().unwrap();
    let spots = [
        (Position::new(1, 4), Direction::Right),
        (Position::new(2, 9), Direction::Left),
        (Position::new(5, 6), Direction::Top),
        (Position::new(7, 11), Direction::Bottom),
        (Position::new(5, 10), Direction::Right),
        (Position::new(3, 7), Direction::Left),
    ];
    for (i, (pos, facing)) in spots.into_iter().enumerate() {
        board.place_robot(RobotId(i as u8), pos, facing);
    }
    board.take_effects();
    board
}

fn players() -> Vec<(PlayerId, RobotId)> {
    (0..6u8).map(|i| (PlayerId(u32::from(i) + 1), RobotId(i))).collect()
}

fn bench_priority_order(c: &mut Criterion) {
    let board = crowded_course();
    let players = players();
    c.bench_function("priority_six_robots", |b| {
        b.iter(|| PriorityResolver::geometric_order(black_box(&board), black_box(&players)))
    });
}

fn bench_conveyors(c: &mut Criterion) {
    let board = crowded_course();
    c.bench_function("conveyors_six_robots", |b| {
        b.iter_batched(
            || board.clone(),
            |mut board| {
                board.activate_conveyors();
                board.take_effects()
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_lasers(c: &mut Criterion) {
    let board = crowded_course();
    c.bench_function("wall_and_robot_lasers", |b| {
        b.iter_batched(
            || board.clone(),
            |mut board| {
                board.fire_wall_lasers();
                board.fire_robot_lasers(&[RobotId(0)]);
                board.take_effects()
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_move_with_push(c: &mut Criterion) {
    let board = crowded_course();
    c.bench_function("move_into_robot_chain", |b| {
        b.iter_batched(
            || board.clone(),
            |mut board| board.move_robot(RobotId(2), Direction::Right),
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_selfplay_game(c: &mut Criterion) {
    let config = SelfPlayConfig {
        players: 4,
        max_rounds: 10,
        quiet: true,
        ..Default::default()
    };
    let board = practice_course().unwrap();
    let mut group = c.benchmark_group("selfplay");
    group.sample_size(20);
    group.bench_function("four_players_ten_rounds", |b| {
        let mut rng = SmallRng::seed_from_u64(42);
        b.iter(|| play_game(board.clone(), black_box(&config), 0, &mut rng))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_priority_order,
    bench_conveyors,
    bench_lasers,
    bench_move_with_push,
    bench_selfplay_game,
);
criterion_main!(benches);
