//! # Dual Time-of-Flight Controller I2C Slave
//!
//! This crate provides the `no_std` slave side of the register interface exposed by a
//! controller driving two time-of-flight distance sensors. A bus master configures the
//! controller through three config registers and reads left/right/min/max/average distances
//! from read-only low/high register pairs.
//!
//! The bus peripheral is abstracted by [`SlaveBus`] and the sensor side by
//! [`SensorControl`]; [`I2cSlave`] runs the register addressing state machine one bus
//! event at a time.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use dual_tof_slave::{Distance, I2cSlave, SlaveBus, XshutControl, DEFAULT_ADDRESS};
//! use embedded_hal_mock::eh1::digital::Mock as PinMock;
//!
//! # struct Peripheral;
//! # impl SlaveBus for Peripheral {
//! #     fn is_address_phase(&self) -> bool { false }
//! #     fn is_read_direction(&self) -> bool { false }
//! #     fn receive_byte(&mut self) -> u8 { 0 }
//! #     fn transmit_byte(&mut self, _data: u8) {}
//! #     fn acknowledge(&mut self) {}
//! #     fn not_acknowledge(&mut self) {}
//! #     fn enable_hold(&mut self) {}
//! # }
//! let mut bus = Peripheral;
//! let control = XshutControl::new(PinMock::new(&[]), PinMock::new(&[]));
//! let mut slave = I2cSlave::new(control);
//!
//! slave.initialize(&mut bus, DEFAULT_ADDRESS).unwrap();
//!
//! // Measurement loop publishes results out of band
//! slave.registers_mut().set_distance(Distance::Left, 412);
//! slave.registers_mut().set_conversion_finished(true);
//!
//! // Bus interrupt handler
//! slave.handle_event(&mut bus).unwrap();
//! ```
#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod fmt; // <-- must be first module!

pub mod registers;
pub mod slave;
pub mod xshut;

pub use registers::{
    ConfigHigh, ConfigLow, Distance, PairRole, Register, RegisterClass, RegisterFile,
};
pub use slave::{Direction, Event, I2cSlave, Response, SensorControl, SlaveBus, State};
pub use xshut::XshutControl;

/// Bus address used until the master reprograms it.
pub const DEFAULT_ADDRESS: u8 = 0x29;

/// Errors reported by the slave.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E: core::fmt::Debug> {
    /// The sensor control collaborator failed
    Sensor(E),
    /// Register address past the end of the register file
    InvalidRegister(u8),
}

impl<E: core::fmt::Debug> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl<E: core::fmt::Debug> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Error::Sensor(error)
    }
}
