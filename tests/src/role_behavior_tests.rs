//! Role selection behavior: one-way transitions, rejections and idempotence

use proptest::prelude::*;
use rstest::rstest;
use syncpwm_core::hal::mock::MockPinMap;
use syncpwm_core::*;

use crate::mock_board;

#[test]
fn reference_twice_keeps_half_duty() {
    let mut board = mock_board(SyncConfig::default());

    assert_eq!(board.become_reference(), RoleOutcome::Entered(Role::Reference));
    assert_eq!(board.role(), Role::Reference);
    assert_eq!(board.duty(), 127);

    assert_eq!(board.become_reference(), RoleOutcome::AlreadyAssigned(Role::Reference));
    assert_eq!(board.role(), Role::Reference);
    assert_eq!(board.duty(), 127);
    assert_eq!(board.period(), NOMINAL_PERIOD);
}

#[test]
fn follower_on_valid_pin() {
    let mut board = mock_board(SyncConfig::default());

    let outcome = board.become_follower(5).unwrap();
    assert!(outcome.entered());
    assert_eq!(outcome.role(), Role::Follower);
    assert_eq!(board.role(), Role::Follower);
    assert_eq!(board.duty(), 0);
    assert_eq!(board.period(), NOMINAL_PERIOD);
    assert!(board.generator().is_interrupt_armed());
    assert_eq!(board.sync_binding(), Some(SyncBinding::new(MockPinMap::PORT_D, 0b0010_0000)));
}

#[rstest]
#[case::atmega328p(SyncConfig::atmega328p())]
#[case::atmega32u4(SyncConfig::atmega32u4())]
#[case::ch32v003(SyncConfig::ch32v003())]
fn follower_on_output_pin_is_rejected(#[case] config: SyncConfig) {
    let mut board = mock_board(config);

    assert_eq!(board.become_follower(config.output_pin), Err(SyncError::ReservedPin));
    assert_eq!(board.role(), Role::Uninitialized);
    assert_eq!(board.sync_binding(), None);
    assert_eq!(board.generator().configure_calls(), 0);
}

#[rstest]
#[case(20)]
#[case(64)]
#[case(255)]
fn follower_on_unresolved_pin_stays_uninitialized(#[case] pin: u8) {
    let mut board = mock_board(SyncConfig::default());

    assert_eq!(board.become_follower(pin), Err(SyncError::UnresolvedPin));
    assert_eq!(board.role(), Role::Uninitialized);
    assert!(!board.generator().is_interrupt_armed());

    // a later valid request still succeeds
    assert!(board.become_follower(4).is_ok());
    assert_eq!(board.role(), Role::Follower);
}

#[test]
fn follower_ignores_later_rebinding() {
    let mut board = mock_board(SyncConfig::default());
    board.become_follower(5).unwrap();
    let binding = board.sync_binding();

    assert_eq!(board.become_follower(9), Ok(RoleOutcome::AlreadyAssigned(Role::Follower)));
    // the reserved pin is only checked before a role exists
    assert_eq!(board.become_follower(3), Ok(RoleOutcome::AlreadyAssigned(Role::Follower)));
    assert_eq!(board.become_reference(), RoleOutcome::AlreadyAssigned(Role::Follower));

    assert_eq!(board.sync_binding(), binding);
    assert_eq!(board.generator().configure_calls(), 1);
    assert_eq!(board.pin_map().configured_input(), Some(5));
}

#[test]
fn reference_never_binds_or_arms() {
    let mut board = mock_board(SyncConfig::default());
    board.become_reference();

    assert_eq!(board.become_follower(5), Ok(RoleOutcome::AlreadyAssigned(Role::Reference)));
    assert_eq!(board.sync_binding(), None);
    assert_eq!(board.diagnostics(), None);
    assert!(!board.generator().is_interrupt_armed());
}

#[derive(Debug, Clone, Copy)]
enum Call {
    Reference,
    Follower(u8),
}

fn call_strategy() -> impl Strategy<Value = Call> {
    prop_oneof![
        Just(Call::Reference),
        any::<u8>().prop_map(Call::Follower),
        (0u8..20).prop_map(Call::Follower),
        Just(Call::Follower(3)),
    ]
}

proptest! {
    #[test]
    fn role_never_changes_once_assigned(calls in prop::collection::vec(call_strategy(), 1..40)) {
        let mut board = mock_board(SyncConfig::default());
        let mut assigned: Option<Role> = None;

        for call in calls {
            match call {
                Call::Reference => { board.become_reference(); }
                Call::Follower(pin) => { let _ = board.become_follower(pin); }
            }

            match assigned {
                Some(role) => prop_assert_eq!(board.role(), role),
                None if board.role().is_assigned() => assigned = Some(board.role()),
                None => {}
            }
        }

        prop_assert!(board.generator().configure_calls() <= 1);
    }

    #[test]
    fn reserved_pin_never_assigns(repeats in 1usize..10) {
        let mut board = mock_board(SyncConfig::default());
        for _ in 0..repeats {
            prop_assert_eq!(board.become_follower(3), Err(SyncError::ReservedPin));
        }
        prop_assert_eq!(board.role(), Role::Uninitialized);
    }
}
