//! Follower driven through an embedded-hal input pin

use embedded_hal_mock::eh1::digital::{Mock as PinMock, State as PinState, Transaction as PinTransaction};
use syncpwm_core::hal::mock::MockWaveform;
use syncpwm_core::*;

type HalBoard = SyncPwm<MockWaveform, EmbeddedHalPinMap<PinMock>>;

const SYNC_PIN: u8 = 7;

fn hal_board(expectations: &[PinTransaction]) -> (HalBoard, PinMock) {
    let pin = PinMock::new(expectations);
    let handle = pin.clone();
    let board = SyncPwm::new(
        SyncConfig::ch32v003(),
        MockWaveform::new(),
        EmbeddedHalPinMap::new(pin, SYNC_PIN),
    );
    (board, handle)
}

fn reads(levels: &[PinState]) -> Vec<PinTransaction> {
    levels.iter().map(|&level| PinTransaction::get(level)).collect()
}

#[test]
fn only_wrapped_pin_resolves() {
    let (mut board, mut handle) = hal_board(&[]);

    assert_eq!(board.become_follower(SYNC_PIN + 1), Err(SyncError::UnresolvedPin));
    assert!(!board.pin_map().is_configured());

    assert!(board.become_follower(SYNC_PIN).unwrap().entered());
    assert!(board.pin_map().is_configured());
    assert_eq!(
        board.sync_binding(),
        Some(SyncBinding::new(EmbeddedHalPinMap::<PinMock>::PORT, EmbeddedHalPinMap::<PinMock>::MASK))
    );

    handle.done();
}

#[test]
fn two_reads_per_period() {
    use PinState::{High, Low};
    let (mut board, mut handle) = hal_board(&reads(&[High, High, High, Low, Low, High, Low, Low]));
    board.become_follower(SYNC_PIN).unwrap();

    assert_eq!(board.on_period_elapsed(), Some(PhaseSample::HIGH));
    assert_eq!(board.on_period_elapsed(), Some(PhaseSample::FALLING));
    assert_eq!(board.on_period_elapsed(), Some(PhaseSample::RISING));
    assert_eq!(board.on_period_elapsed(), Some(PhaseSample::LOW));

    // +1 -1 0 -1
    assert_eq!(board.period(), NOMINAL_PERIOD - 1);
    handle.done();
}

#[test]
fn released_pin_has_no_pending_reads() {
    use PinState::Low;
    let pin = PinMock::new(&reads(&[Low, Low]));
    let mut pins = EmbeddedHalPinMap::new(pin, SYNC_PIN);
    let binding = pins.resolve(SYNC_PIN).unwrap();

    assert_eq!(pins.read_level(binding), Ok(false));
    assert_eq!(pins.read_level(binding), Ok(false));
    assert_eq!(pins.read_port(EmbeddedHalPinMap::<PinMock>::PORT + 1), Err(HalError::InvalidConfig));

    let mut pin = pins.release();
    pin.done();
}

#[test]
fn reference_never_reads_the_pin() {
    let (mut board, mut handle) = hal_board(&[]);
    board.become_reference();

    assert_eq!(board.on_period_elapsed(), None);
    assert_eq!(board.duty(), NOMINAL_PERIOD / 2);
    handle.done();
}

#[test]
fn diagnostics_without_register_address() {
    use PinState::High;
    let (mut board, mut handle) = hal_board(&reads(&[High, High]));
    board.become_follower(SYNC_PIN).unwrap();
    board.on_period_elapsed();

    let report = board.diagnostics().unwrap();
    assert_eq!(report.input_register, None);
    assert_eq!(report.to_line().as_str(), "port=0 mask=1 00=0 01=0 10=0 11=1");
    handle.done();
}
