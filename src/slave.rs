//! Byte-level transaction state machine.
//!
//! The bus peripheral raises one event per byte (address match, byte received,
//! byte requested) and holds the clock line until the event is answered. The
//! [`I2cSlave`] consumes each event, moves the register pointer and answers
//! with an acknowledge, a not-acknowledge or the next byte to shift out.

use crate::registers::{
    self, PairRole, Register, RegisterClass, RegisterFile, AUTO_INC, CONV_FINISHED,
    FIRST_CONFIG_ADDRESS, FIRST_DATA_ADDRESS, LAST_CONFIG_ADDRESS, LAST_DATA_ADDRESS,
};
use crate::Error;

/// Transaction phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// No transaction in progress
    Idle,
    /// Addressed for a write, next byte selects the register
    WaitingRegister,
    /// Master reads, each request shifts out the register at the pointer
    SendingData,
    /// Master writes, each byte is data for the register at the pointer
    ReceivingData,
}

/// Transfer direction as seen from the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Master reads from the slave
    Read,
    /// Master writes to the slave
    Write,
}

/// A single bus event delivered to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Our address matched, start or repeated start
    Addressed(Direction),
    /// Master sent a data byte
    Received(u8),
    /// Master clocks out the next byte
    TransmitRequested,
}

/// Answer to a bus event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Response {
    /// Acknowledge and release the clock
    Ack,
    /// Not-acknowledge and release the clock
    Nack,
    /// Load the byte for transmission and release the clock
    Transmit(u8),
}

/// Bus peripheral as seen from the interrupt handler.
///
/// Every call is synchronous; the peripheral keeps the clock line low until
/// [`acknowledge`](Self::acknowledge) or
/// [`not_acknowledge`](Self::not_acknowledge) is called.
pub trait SlaveBus {
    /// `true` if the pending event is an address match, `false` for data.
    fn is_address_phase(&self) -> bool;
    /// `true` if the master is reading.
    fn is_read_direction(&self) -> bool;
    /// Takes the byte received from the master.
    fn receive_byte(&mut self) -> u8;
    /// Loads a byte to shift out to the master.
    fn transmit_byte(&mut self, data: u8);
    /// Acknowledges and releases the clock line.
    fn acknowledge(&mut self);
    /// Not-acknowledges and releases the clock line.
    fn not_acknowledge(&mut self);
    /// Holds the clock after address and data bytes until answered.
    fn enable_hold(&mut self);
}

/// Sensor side collaborator receiving accepted configuration writes.
///
/// Calls are already serialized by the interrupt context and must not block.
pub trait SensorControl {
    /// Error reported by the collaborator.
    type Error: core::fmt::Debug;

    /// Applies a new low configuration byte (sticky bits already merged).
    ///
    /// # Errors
    ///
    /// Implementation defined.
    fn apply_low_config(&mut self, config: u8) -> Result<(), Self::Error>;

    /// Applies a new high configuration byte.
    ///
    /// # Errors
    ///
    /// Implementation defined.
    fn apply_high_config(&mut self, config: u8) -> Result<(), Self::Error>;

    /// Reprograms the slave bus address.
    ///
    /// # Errors
    ///
    /// Implementation defined.
    fn program_bus_address(&mut self, address: u8) -> Result<(), Self::Error>;
}

/// Returns the register the pointer moves to after a byte transfer at `addr`.
///
/// Config and data registers form two separate cycles; the pointer never
/// crosses from one to the other. Without auto-increment a config pointer
/// stays put and a data pointer alternates between the halves of its pair.
#[must_use]
pub fn next_register(addr: u8, auto_increment: bool) -> u8 {
    match (registers::classify(addr), auto_increment) {
        (RegisterClass::Config, false) => addr,
        (RegisterClass::Config, true) => {
            if addr >= LAST_CONFIG_ADDRESS {
                FIRST_CONFIG_ADDRESS
            } else {
                addr + 1
            }
        }
        (RegisterClass::Data, false) => match registers::pair_role(addr) {
            PairRole::Low => addr + 1,
            PairRole::High => addr - 1,
            PairRole::Standalone => addr,
        },
        (RegisterClass::Data, true) => {
            if addr >= LAST_DATA_ADDRESS {
                FIRST_DATA_ADDRESS
            } else {
                addr + 1
            }
        }
        (RegisterClass::Invalid, _) => FIRST_CONFIG_ADDRESS,
    }
}

/// Slave side of the register interface.
///
/// Owns the register file, the register pointer and the auto-increment flag.
/// Measurement results are stored into the register file out of band through
/// [`registers_mut`](Self::registers_mut).
pub struct I2cSlave<S> {
    /// Collaborator receiving configuration writes
    control: S,
    /// Register contents served to the master
    registers: RegisterFile,
    /// Current transaction phase
    state: State,
    /// Register used by the next data byte
    pointer: u8,
    /// Pointer auto-increment, mirrors bit 4 of the last low config write
    auto_increment: bool,
}

impl<S, E> I2cSlave<S>
where
    S: SensorControl<Error = E>,
    E: core::fmt::Debug,
{
    /// Creates a slave with a zeroed register file.
    pub fn new(control: S) -> Self {
        Self::with_registers(control, RegisterFile::new())
    }

    /// Creates a slave serving an existing register file.
    ///
    /// The auto-increment flag is taken from the stored low config byte.
    pub fn with_registers(control: S, registers: RegisterFile) -> Self {
        let auto_increment = registers.config_low().auto_increment;
        Self {
            control,
            registers,
            state: State::Idle,
            pointer: FIRST_CONFIG_ADDRESS,
            auto_increment,
        }
    }

    /// Programs the bus address and enables clock hold on address and data.
    ///
    /// The address is also stored in the address register so the master can
    /// read it back.
    ///
    /// # Errors
    ///
    /// * `Err(Error::Sensor(E))` - if the collaborator failed to program the address
    pub fn initialize<B: SlaveBus>(&mut self, bus: &mut B, address: u8) -> Result<(), Error<E>> {
        info!("Initializing slave at address {:#x}", address);
        self.registers.write(Register::Address, address);
        self.control.program_bus_address(address)?;
        bus.enable_hold();
        self.state = State::Idle;
        Ok(())
    }

    /// Handles the event currently pending on `bus` and answers it.
    ///
    /// The bus is always answered, even when the collaborator fails.
    ///
    /// # Errors
    ///
    /// * `Err(Error::Sensor(E))` - if forwarding an accepted write failed
    pub fn handle_event<B: SlaveBus>(&mut self, bus: &mut B) -> Result<(), Error<E>> {
        let event = if bus.is_address_phase() {
            let direction = if bus.is_read_direction() {
                Direction::Read
            } else {
                Direction::Write
            };
            Event::Addressed(direction)
        } else if bus.is_read_direction() {
            Event::TransmitRequested
        } else {
            Event::Received(bus.receive_byte())
        };

        match self.handle(event) {
            Ok(response) => {
                respond(bus, response);
                Ok(())
            }
            Err(e) => {
                // only data writes reach the collaborator and those are always acknowledged
                bus.acknowledge();
                Err(e)
            }
        }
    }

    /// Runs one event through the state machine.
    ///
    /// # Errors
    ///
    /// * `Err(Error::Sensor(E))` - if forwarding an accepted write failed; the
    ///   byte is stored and must still be acknowledged
    pub fn handle(&mut self, event: Event) -> Result<Response, Error<E>> {
        trace!("Event {:?} in {:?}", event, self.state);
        match event {
            Event::Addressed(direction) => Ok(self.addressed(direction)),
            Event::Received(data) => self.received(data),
            Event::TransmitRequested => Ok(self.transmit_requested()),
        }
    }

    /// Stop or restart condition seen on the bus.
    pub fn stop(&mut self) {
        self.set_state(State::Idle);
    }

    /// Reloads the auto-increment flag from the stored low config byte.
    pub fn resync_auto_increment(&mut self) {
        self.auto_increment = self.registers.config_low().auto_increment;
    }

    /// Current transaction phase.
    pub fn state(&self) -> State {
        self.state
    }

    /// Register used by the next data byte.
    pub fn pointer(&self) -> u8 {
        self.pointer
    }

    /// Whether the pointer advances after each data byte.
    pub fn auto_increment(&self) -> bool {
        self.auto_increment
    }

    /// Register contents served to the master.
    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// Mutable register contents, used to publish measurements.
    pub fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.registers
    }

    /// Sensor collaborator.
    pub fn control(&self) -> &S {
        &self.control
    }

    /// Mutable sensor collaborator.
    pub fn control_mut(&mut self) -> &mut S {
        &mut self.control
    }

    /// Releases the collaborator and the register file.
    pub fn release(self) -> (S, RegisterFile) {
        (self.control, self.registers)
    }

    fn set_state(&mut self, state: State) {
        if self.state != state {
            trace!("{:?} -> {:?}", self.state, state);
        }
        self.state = state;
    }

    fn addressed(&mut self, direction: Direction) -> Response {
        match direction {
            Direction::Write => {
                self.set_state(State::WaitingRegister);
                Response::Ack
            }
            Direction::Read => {
                self.set_state(State::SendingData);
                self.transmit_next()
            }
        }
    }

    fn received(&mut self, data: u8) -> Result<Response, Error<E>> {
        match self.state {
            State::WaitingRegister => Ok(self.select_register(data)),
            State::ReceivingData => self.receive_data(data),
            State::Idle | State::SendingData => {
                warn!("Discarding byte {:#x} received in {:?}", data, self.state);
                Ok(Response::Ack)
            }
        }
    }

    fn transmit_requested(&mut self) -> Response {
        if self.state != State::SendingData {
            warn!("Transmit requested in {:?}", self.state);
            self.set_state(State::SendingData);
        }
        self.transmit_next()
    }

    fn select_register(&mut self, register: u8) -> Response {
        if registers::classify(register) == RegisterClass::Invalid {
            warn!("Register {:#x} out of range", register);
            return Response::Nack;
        }
        debug!("Selected register {:#x}", register);
        self.pointer = register;
        self.set_state(State::ReceivingData);
        Response::Ack
    }

    fn receive_data(&mut self, data: u8) -> Result<Response, Error<E>> {
        let stored = self.store(self.pointer, data);

        // auto-increment keeps streaming data, otherwise the next byte is a register
        if self.auto_increment {
            self.pointer = next_register(self.pointer, true);
        } else {
            self.set_state(State::WaitingRegister);
        }

        stored.map(|()| Response::Ack)
    }

    fn store(&mut self, addr: u8, data: u8) -> Result<(), Error<E>> {
        const CONFIG_L: u8 = Register::ConfigL as u8;
        const CONFIG_H: u8 = Register::ConfigH as u8;
        const ADDRESS: u8 = Register::Address as u8;

        if !registers::is_writable(addr) {
            debug!("Ignoring write of {:#x} to read-only register {:#x}", data, addr);
            return Ok(());
        }

        match addr {
            CONFIG_L => {
                let sticky = self.registers.read(Register::ConfigL) & CONV_FINISHED;
                let config = (data & !CONV_FINISHED) | sticky;
                self.registers.write(Register::ConfigL, config);
                self.auto_increment = config & AUTO_INC != 0;
                debug!("Low config {:#x}, auto-increment {}", config, self.auto_increment);
                self.forward(|control| control.apply_low_config(config))
            }
            CONFIG_H => {
                self.registers.write(Register::ConfigH, data);
                debug!("High config {:#x}", data);
                self.forward(|control| control.apply_high_config(data))
            }
            ADDRESS => {
                // the bus gets the address held before this write, the register shows the new one
                let previous = self.registers.read(Register::Address);
                self.registers.write(Register::Address, data);
                debug!("Address register {:#x}, programming {:#x}", data, previous);
                self.forward(|control| control.program_bus_address(previous))
            }
            _ => self.registers.set(addr, data),
        }
    }

    fn forward<F>(&mut self, f: F) -> Result<(), Error<E>>
    where
        F: FnOnce(&mut S) -> Result<(), E>,
    {
        f(&mut self.control).map_err(|e| {
            error!("Sensor control rejected write to register {:#x}", self.pointer);
            Error::Sensor(e)
        })
    }

    fn transmit_next(&mut self) -> Response {
        let data = self.registers.get(self.pointer).unwrap_or_default();
        trace!("Sending {:#x} from register {:#x}", data, self.pointer);
        self.pointer = next_register(self.pointer, self.auto_increment);
        Response::Transmit(data)
    }
}

fn respond<B: SlaveBus>(bus: &mut B, response: Response) {
    match response {
        Response::Ack => bus.acknowledge(),
        Response::Nack => bus.not_acknowledge(),
        Response::Transmit(data) => {
            bus.transmit_byte(data);
            bus.acknowledge();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_pointer_holds_without_auto_increment() {
        for addr in FIRST_CONFIG_ADDRESS..=LAST_CONFIG_ADDRESS {
            assert_eq!(next_register(addr, false), addr);
        }
    }

    #[test]
    fn config_pointer_wraps_at_address_register() {
        assert_eq!(next_register(0x00, true), 0x01);
        assert_eq!(next_register(0x01, true), 0x02);
        assert_eq!(next_register(0x02, true), 0x00);
    }

    #[test]
    fn data_pointer_toggles_pair_without_auto_increment() {
        assert_eq!(next_register(Register::RightL.into(), false), u8::from(Register::RightH));
        assert_eq!(next_register(Register::RightH.into(), false), u8::from(Register::RightL));
        assert_eq!(next_register(Register::AvgL.into(), false), u8::from(Register::AvgH));
        assert_eq!(next_register(Register::AvgH.into(), false), u8::from(Register::AvgL));
    }

    #[test]
    fn data_pointer_wraps_at_last_data_register() {
        let mut addr = FIRST_DATA_ADDRESS;
        for expected in (FIRST_DATA_ADDRESS + 1..=LAST_DATA_ADDRESS).chain([FIRST_DATA_ADDRESS]) {
            addr = next_register(addr, true);
            assert_eq!(addr, expected);
        }
    }

    #[test]
    fn pointer_never_leaves_its_class() {
        for addr in 0..=LAST_DATA_ADDRESS {
            for auto_increment in [false, true] {
                assert_eq!(
                    registers::classify(next_register(addr, auto_increment)),
                    registers::classify(addr)
                );
            }
        }
    }
}
