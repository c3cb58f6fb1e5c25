use dual_tof_slave::registers::{AUTO_INC, CONT_MODE, L_EN, R_EN, XTALK};
use dual_tof_slave::{Direction, Event, I2cSlave, Register, SensorControl, XshutControl};
use embedded_hal_mock::eh1::digital::{
    Mock as PinMock, State as PinState, Transaction as PinTransaction,
};

fn done(control: XshutControl<PinMock, PinMock>) {
    let (mut left, mut right) = control.release();
    left.done();
    right.done();
}

#[test]
fn channel_enables_drive_xshut_pins() {
    let left = PinMock::new(&[
        PinTransaction::set(PinState::High),
        PinTransaction::set(PinState::Low),
    ]);
    let right = PinMock::new(&[
        PinTransaction::set(PinState::Low),
        PinTransaction::set(PinState::High),
    ]);
    let mut control = XshutControl::new(left, right);

    control.apply_low_config(L_EN | XTALK).unwrap();
    assert!(control.config_low().left_enabled);
    assert!(control.config_low().xtalk);

    control.apply_low_config(R_EN | CONT_MODE).unwrap();
    assert!(!control.config_low().left_enabled);
    assert!(control.config_low().continuous);

    done(control);
}

#[test]
fn high_config_is_decoded() {
    let mut control = XshutControl::new(PinMock::new(&[]), PinMock::new(&[]));

    control.apply_high_config(0b1100_1010).unwrap();

    assert_eq!(control.config_high().interrupt_mode, 0b11);
    assert_eq!(control.config_high().duration, 0b00_1010);
    done(control);
}

#[test]
fn programmed_address_is_taken_once() {
    let mut control = XshutControl::new(PinMock::new(&[]), PinMock::new(&[]));
    assert_eq!(control.take_pending_address(), None);

    control.program_bus_address(0x29).unwrap();

    assert_eq!(control.take_pending_address(), Some(0x29));
    assert_eq!(control.take_pending_address(), None);
    done(control);
}

#[test]
fn master_write_powers_both_channels() {
    let left = PinMock::new(&[PinTransaction::set(PinState::High)]);
    let right = PinMock::new(&[PinTransaction::set(PinState::High)]);
    let mut slave = I2cSlave::new(XshutControl::new(left, right));

    slave.handle(Event::Addressed(Direction::Write)).unwrap();
    slave.handle(Event::Received(Register::ConfigL.into())).unwrap();
    slave.handle(Event::Received(L_EN | R_EN | AUTO_INC)).unwrap();
    slave.stop();

    assert!(slave.auto_increment());
    let config = slave.control().config_low();
    assert!(config.left_enabled && config.right_enabled && config.auto_increment);

    let (control, _) = slave.release();
    done(control);
}

#[test]
fn address_register_write_reaches_platform() {
    let mut slave = I2cSlave::new(XshutControl::new(PinMock::new(&[]), PinMock::new(&[])));
    slave.registers_mut().write(Register::Address, 0x29);

    slave.handle(Event::Addressed(Direction::Write)).unwrap();
    slave.handle(Event::Received(Register::Address.into())).unwrap();
    slave.handle(Event::Received(0x30)).unwrap();
    slave.stop();

    assert_eq!(slave.control_mut().take_pending_address(), Some(0x29));
    assert_eq!(slave.registers().read(Register::Address), 0x30);

    let (control, _) = slave.release();
    done(control);
}
