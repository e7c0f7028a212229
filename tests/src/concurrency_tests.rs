//! Foreground calls racing the periodic handler through the shared cell

use std::sync::Arc;
use std::time::Duration;

use syncpwm_core::*;

use crate::{mock_board, SharedMockBoard};

const SYNC_PIN: u8 = 5;

fn shared_follower(config: SyncConfig) -> Arc<SharedMockBoard> {
    let shared = Arc::new(SharedMockBoard::new());
    shared.install(mock_board(config)).unwrap();
    shared.become_follower(SYNC_PIN).unwrap();
    shared
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn duty_updates_race_period_handler() {
    let shared = shared_follower(SyncConfig::atmega328p());

    let handler = {
        let shared = Arc::clone(&shared);
        tokio::spawn(async move {
            for tick in 0..2_000u32 {
                shared.with(|pwm| pwm.pin_map().set_level(SYNC_PIN, tick % 3 == 0));
                shared.on_period_elapsed();
                if tick % 64 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        })
    };

    let mut last = 0;
    for value in (0..=300u16).step_by(7) {
        last = shared.set_duty_cycle(value).unwrap();
        tokio::task::yield_now().await;
    }
    handler.await.unwrap();

    let (period, duty) = shared.registers().unwrap();
    assert_eq!(duty, last);
    assert_eq!(last, NOMINAL_PERIOD);
    assert!((1..=255).contains(&period));
    assert_eq!(shared.phase_counts().total(), 2_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn handler_acknowledges_every_period() {
    let shared = shared_follower(SyncConfig::ch32v003());

    let ticks: Vec<_> = (0..4)
        .map(|_| {
            let shared = Arc::clone(&shared);
            tokio::spawn(async move {
                for _ in 0..250 {
                    shared.on_period_elapsed();
                }
            })
        })
        .collect();
    for tick in ticks {
        tick.await.unwrap();
    }

    let acknowledged = shared.with(|pwm| pwm.generator().acknowledged()).unwrap();
    assert_eq!(acknowledged, 1_000);
    // static low input shortens once per period
    assert_eq!(shared.registers().map(|(period, _)| period), Some(1));
}

#[tokio::test(start_paused = true)]
async fn diagnostics_poll_sees_counts_grow() {
    let shared = shared_follower(SyncConfig::default());
    let mut interval = tokio::time::interval(Duration::from_millis(1));
    let mut previous = 0;

    for _ in 0..5 {
        interval.tick().await;
        for _ in 0..10 {
            shared.on_period_elapsed();
        }
        let report = shared.diagnostics().unwrap();
        assert!(report.counts.total() > previous);
        previous = report.counts.total();
    }

    assert_eq!(previous, 50);
}

#[test]
fn uninstalled_cell_is_inert() {
    let shared = SharedMockBoard::new();

    assert!(!shared.is_installed());
    assert_eq!(shared.role(), Role::Uninitialized);
    assert_eq!(shared.become_reference(), None);
    assert_eq!(shared.become_follower(SYNC_PIN), Err(SyncError::NotInstalled));
    assert_eq!(shared.on_period_elapsed(), None);
    assert_eq!(shared.registers(), None);

    // installing afterwards makes the same request succeed
    shared.install(mock_board(SyncConfig::default())).unwrap();
    assert!(shared.become_follower(SYNC_PIN).unwrap().entered());
}

#[test]
fn second_install_is_rejected() {
    let shared = SharedMockBoard::new();
    shared.install(mock_board(SyncConfig::default())).unwrap();
    shared.become_reference();

    assert_eq!(
        shared.install(mock_board(SyncConfig::default())).err(),
        Some(SyncError::AlreadyInstalled)
    );
    assert_eq!(shared.role(), Role::Reference);
}
