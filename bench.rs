use criterion::{Criterion, black_box, criterion_group, criterion_main};
use markerlink::{ChainSolver, Channel, Detection, Tracker, smoothing::{AngleChannels, ExpSmoother}};
use markerlink_core::config::Config;

fn solve(c: &mut Criterion) {
    let solver = ChainSolver::default();
    let mut channels = AngleChannels::new();
    let pass = ExpSmoother::passthrough();
    for (i, ch) in Channel::ALL.into_iter().enumerate() {
        channels.update(ch, 10.0 * i as f64 + 5.0, &pass);
    }

    c.bench_function("chain solve", |b| b.iter(|| solver.solve(black_box(&channels))));
}

fn track(c: &mut Criterion) {
    let mut tracker = Tracker::from_config(&Config::default());
    let frame = [
        Detection::new(0, [0.0, 0.3, 0.0], [0.0, 0.0, 0.5]),
        Detection::new(1, [0.0, -0.2, 0.0], [0.1, 0.0, 0.5]),
        Detection::new(2, [0.4, 0.1, 0.0], [0.2, 0.0, 0.5]),
        Detection::new(3, [0.1, 0.0, 0.05], [0.0, 0.1, 0.5]),
    ];

    c.bench_function("process frame", |b| {
        b.iter(|| tracker.process_frame(black_box(&frame)))
    });
}

criterion_group!(benches, solve, track);
criterion_main!(benches);
