use criterion::{black_box, criterion_group, criterion_main, Criterion};
use syncpwm_core::hal::mock::{MockPinMap, MockWaveform};
use syncpwm_core::{PhaseLockController, PhaseSample, SharedSyncPwm, SyncConfig, SyncPwm};

fn follower(config: SyncConfig) -> SyncPwm<MockWaveform, MockPinMap> {
    let mut board = SyncPwm::new(config, MockWaveform::new(), MockPinMap::new());
    // pin 5 always resolves on the mock pin map
    let _ = board.become_follower(5);
    board
}

fn bench_next_period(c: &mut Criterion) {
    let controller = PhaseLockController::new(&SyncConfig::default());
    c.bench_function("next_period", |b| {
        b.iter(|| controller.next_period(black_box(254), black_box(PhaseSample::HIGH)))
    });
}

fn bench_on_period_elapsed(c: &mut Criterion) {
    let mut board = follower(SyncConfig::default());
    let mut high = false;
    c.bench_function("on_period_elapsed", |b| {
        b.iter(|| {
            high = !high;
            board.pin_map().set_level(5, high);
            black_box(board.on_period_elapsed())
        })
    });
}

fn bench_shared_handler(c: &mut Criterion) {
    let shared = SharedSyncPwm::new();
    let _ = shared.install(follower(SyncConfig::ch32v003()));
    c.bench_function("shared_on_period_elapsed", |b| {
        b.iter(|| black_box(shared.on_period_elapsed()))
    });
}

criterion_group!(benches, bench_next_period, bench_on_period_elapsed, bench_shared_handler);
criterion_main!(benches);
