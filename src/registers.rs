//! Register map and register file exposed to the bus master.
//!
//! The map is split in two independent address ranges:
//!
//! | Address | Register    | Class  | Role       |
//! |---------|-------------|--------|------------|
//! | 0x00    | `ConfigL`   | config | low        |
//! | 0x01    | `ConfigH`   | config | high       |
//! | 0x02    | `Address`   | config | standalone |
//! | 0x03    | `RightL`    | data   | low        |
//! | 0x04    | `RightH`    | data   | high       |
//! | 0x05    | `LeftL`     | data   | low        |
//! | 0x06    | `LeftH`     | data   | high       |
//! | 0x07    | `MinL`      | data   | low        |
//! | 0x08    | `MinH`      | data   | high       |
//! | 0x09    | `MaxL`      | data   | low        |
//! | 0x0A    | `MaxH`      | data   | high       |
//! | 0x0B    | `AvgL`      | data   | low        |
//! | 0x0C    | `AvgH`      | data   | high       |
//!
//! Config registers are writable by the master, data registers are read-only
//! and filled in by the measurement side.

/// Register addresses of the slave register file.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// Low configuration byte (0x00)
    ConfigL = 0x00,
    /// High configuration byte (0x01)
    ConfigH = 0x01,
    /// Slave bus address (0x02)
    Address = 0x02,
    /// Right distance, low byte (0x03)
    RightL = 0x03,
    /// Right distance, high byte (0x04)
    RightH = 0x04,
    /// Left distance, low byte (0x05)
    LeftL = 0x05,
    /// Left distance, high byte (0x06)
    LeftH = 0x06,
    /// Minimum distance, low byte (0x07)
    MinL = 0x07,
    /// Minimum distance, high byte (0x08)
    MinH = 0x08,
    /// Maximum distance, low byte (0x09)
    MaxL = 0x09,
    /// Maximum distance, high byte (0x0A)
    MaxH = 0x0A,
    /// Average distance, low byte (0x0B)
    AvgL = 0x0B,
    /// Average distance, high byte (0x0C)
    AvgH = 0x0C,
}

impl From<Register> for u8 {
    fn from(r: Register) -> Self {
        r as u8
    }
}

/// First config register; target of the config wrap-around.
pub const FIRST_CONFIG_ADDRESS: u8 = Register::ConfigL as u8;
/// Last config register.
pub const LAST_CONFIG_ADDRESS: u8 = Register::Address as u8;
/// First data register; target of the data wrap-around.
pub const FIRST_DATA_ADDRESS: u8 = Register::RightL as u8;
/// Last data register.
pub const LAST_DATA_ADDRESS: u8 = Register::AvgH as u8;
/// Highest address that may be selected by the master.
pub const LAST_ADDRESS: u8 = LAST_DATA_ADDRESS;
/// Number of bytes in the register file.
pub const REGISTER_COUNT: usize = LAST_ADDRESS as usize + 1;

/// Left channel enable bit of [`Register::ConfigL`].
pub const L_EN: u8 = 0b1000_0000;
/// Right channel enable bit of [`Register::ConfigL`].
pub const R_EN: u8 = 0b0100_0000;
/// Cross-talk compensation bit of [`Register::ConfigL`].
pub const XTALK: u8 = 0b0010_0000;
/// Auto-increment bit of [`Register::ConfigL`].
pub const AUTO_INC: u8 = 0b0001_0000;
/// Continuous conversion mode bit of [`Register::ConfigL`].
pub const CONT_MODE: u8 = 0b0000_1000;
/// Start conversion bit of [`Register::ConfigL`].
pub const CONV: u8 = 0b0000_0100;
/// Sticky conversion-finished status bit of [`Register::ConfigL`].
pub const CONV_FINISHED: u8 = 0b0000_0010;

/// Access class of a register address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterClass {
    /// Writable configuration register
    Config,
    /// Read-only measurement register
    Data,
    /// Address past the end of the register file
    Invalid,
}

/// Position of a register within a 16-bit low/high pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PairRole {
    /// Low byte of a pair
    Low,
    /// High byte of a pair
    High,
    /// Single-byte register
    Standalone,
}

/// Classifies a register address.
#[must_use]
pub fn classify(addr: u8) -> RegisterClass {
    match addr {
        FIRST_CONFIG_ADDRESS..=LAST_CONFIG_ADDRESS => RegisterClass::Config,
        FIRST_DATA_ADDRESS..=LAST_DATA_ADDRESS => RegisterClass::Data,
        _ => RegisterClass::Invalid,
    }
}

/// Returns `true` if the master may write the register at `addr`.
#[must_use]
pub fn is_writable(addr: u8) -> bool {
    classify(addr) == RegisterClass::Config
}

/// Returns the pair role of the register at `addr`.
///
/// Every valid address other than [`Register::Address`] belongs to a
/// low/high pair; the low byte always sits at the lower address.
#[must_use]
pub fn pair_role(addr: u8) -> PairRole {
    const LOW_REGISTERS: [u8; 6] = [
        Register::ConfigL as u8,
        Register::RightL as u8,
        Register::LeftL as u8,
        Register::MinL as u8,
        Register::MaxL as u8,
        Register::AvgL as u8,
    ];

    if addr == Register::Address as u8 {
        PairRole::Standalone
    } else if LOW_REGISTERS.contains(&addr) {
        PairRole::Low
    } else {
        PairRole::High
    }
}

/// Measurement slots exposed through the data registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Distance {
    /// Right sensor distance
    Right,
    /// Left sensor distance
    Left,
    /// Minimum of both sensors
    Min,
    /// Maximum of both sensors
    Max,
    /// Average of both sensors
    Average,
}

impl Distance {
    /// Low byte register of this slot; the high byte follows it.
    #[must_use]
    pub fn low_register(self) -> Register {
        match self {
            Distance::Right => Register::RightL,
            Distance::Left => Register::LeftL,
            Distance::Min => Register::MinL,
            Distance::Max => Register::MaxL,
            Distance::Average => Register::AvgL,
        }
    }
}

/// Decoded view of [`Register::ConfigL`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(clippy::struct_excessive_bools)]
pub struct ConfigLow {
    /// Left channel enabled
    pub left_enabled: bool,
    /// Right channel enabled
    pub right_enabled: bool,
    /// Cross-talk compensation enabled
    pub xtalk: bool,
    /// Register pointer auto-increment enabled
    pub auto_increment: bool,
    /// Continuous conversion mode (single-shot otherwise)
    pub continuous: bool,
    /// Conversion requested
    pub convert: bool,
    /// Last conversion finished (sticky status)
    pub conversion_finished: bool,
}

impl From<u8> for ConfigLow {
    fn from(value: u8) -> Self {
        Self {
            left_enabled: value & L_EN != 0,
            right_enabled: value & R_EN != 0,
            xtalk: value & XTALK != 0,
            auto_increment: value & AUTO_INC != 0,
            continuous: value & CONT_MODE != 0,
            convert: value & CONV != 0,
            conversion_finished: value & CONV_FINISHED != 0,
        }
    }
}

impl From<ConfigLow> for u8 {
    fn from(config: ConfigLow) -> Self {
        [
            (config.left_enabled, L_EN),
            (config.right_enabled, R_EN),
            (config.xtalk, XTALK),
            (config.auto_increment, AUTO_INC),
            (config.continuous, CONT_MODE),
            (config.convert, CONV),
            (config.conversion_finished, CONV_FINISHED),
        ]
        .iter()
        .filter(|(set, _)| *set)
        .fold(0u8, |acc, (_, bit)| acc | bit)
    }
}

/// Decoded view of [`Register::ConfigH`].
///
/// Bits 7:6 hold the interrupt mode, bits 5:0 the measurement duration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigHigh {
    /// Interrupt mode (0-3)
    pub interrupt_mode: u8,
    /// Measurement duration (0-63)
    pub duration: u8,
}

impl From<u8> for ConfigHigh {
    fn from(value: u8) -> Self {
        Self {
            interrupt_mode: value >> 6,
            duration: value & 0x3F,
        }
    }
}

impl From<ConfigHigh> for u8 {
    fn from(config: ConfigHigh) -> Self {
        ((config.interrupt_mode & 0x03) << 6) | (config.duration & 0x3F)
    }
}

/// Backing storage of the register map.
///
/// Config bytes hold what the master last wrote; data bytes hold what the
/// measurement side last supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterFile {
    bytes: [u8; REGISTER_COUNT],
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    /// Creates a zeroed register file.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bytes: [0; REGISTER_COUNT],
        }
    }

    /// Reads the byte at `addr`, or `None` past the end of the map.
    #[must_use]
    pub fn get(&self, addr: u8) -> Option<u8> {
        self.bytes.get(usize::from(addr)).copied()
    }

    /// Stores `value` at `addr`.
    ///
    /// # Errors
    ///
    /// * `Err(Error::InvalidRegister(addr))` - if `addr` is past the end of the map
    pub fn set<E>(&mut self, addr: u8, value: u8) -> Result<(), crate::Error<E>>
    where
        E: core::fmt::Debug,
    {
        let slot = self
            .bytes
            .get_mut(usize::from(addr))
            .ok_or(crate::Error::InvalidRegister(addr))?;
        *slot = value;
        Ok(())
    }

    /// Reads a named register.
    #[must_use]
    pub fn read(&self, register: Register) -> u8 {
        self.bytes[register as usize]
    }

    /// Writes a named register.
    pub fn write(&mut self, register: Register, value: u8) {
        self.bytes[register as usize] = value;
    }

    /// Returns the 16-bit value of a measurement slot.
    #[must_use]
    pub fn distance(&self, slot: Distance) -> u16 {
        let low = slot.low_register() as usize;
        u16::from_le_bytes([self.bytes[low], self.bytes[low + 1]])
    }

    /// Stores a 16-bit measurement as its low/high register pair.
    pub fn set_distance(&mut self, slot: Distance, value: u16) {
        let low = slot.low_register() as usize;
        self.bytes[low..=low + 1].copy_from_slice(&value.to_le_bytes());
    }

    /// Decoded low configuration byte.
    #[must_use]
    pub fn config_low(&self) -> ConfigLow {
        ConfigLow::from(self.read(Register::ConfigL))
    }

    /// Decoded high configuration byte.
    #[must_use]
    pub fn config_high(&self) -> ConfigHigh {
        ConfigHigh::from(self.read(Register::ConfigH))
    }

    /// Sets or clears the sticky conversion-finished bit.
    ///
    /// Only the measurement side changes this bit; master writes keep it.
    pub fn set_conversion_finished(&mut self, finished: bool) {
        let config = self.read(Register::ConfigL);
        let config = if finished {
            config | CONV_FINISHED
        } else {
            config & !CONV_FINISHED
        };
        self.write(Register::ConfigL, config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_covers_both_ranges() {
        for addr in 0x00..=0x02 {
            assert_eq!(classify(addr), RegisterClass::Config);
            assert!(is_writable(addr));
        }
        for addr in 0x03..=0x0C {
            assert_eq!(classify(addr), RegisterClass::Data);
            assert!(!is_writable(addr));
        }
        for addr in 0x0D..=0xFF {
            assert_eq!(classify(addr), RegisterClass::Invalid);
            assert!(!is_writable(addr));
        }
    }

    #[test]
    fn pair_roles() {
        assert_eq!(pair_role(Register::ConfigL.into()), PairRole::Low);
        assert_eq!(pair_role(Register::ConfigH.into()), PairRole::High);
        assert_eq!(pair_role(Register::Address.into()), PairRole::Standalone);
        for addr in (FIRST_DATA_ADDRESS..=LAST_DATA_ADDRESS).step_by(2) {
            assert_eq!(pair_role(addr), PairRole::Low);
            assert_eq!(pair_role(addr + 1), PairRole::High);
        }
    }

    #[test]
    fn distances_are_little_endian_pairs() {
        let mut file = RegisterFile::new();
        file.set_distance(Distance::Left, 0x1234);
        assert_eq!(file.read(Register::LeftL), 0x34);
        assert_eq!(file.read(Register::LeftH), 0x12);
        assert_eq!(file.distance(Distance::Left), 0x1234);
        assert_eq!(file.distance(Distance::Right), 0);
    }

    #[test]
    fn out_of_range_access_is_rejected() {
        let mut file = RegisterFile::new();
        assert_eq!(file.get(LAST_ADDRESS + 1), None);
        assert!(matches!(
            file.set::<()>(LAST_ADDRESS + 1, 0xAA),
            Err(crate::Error::InvalidRegister(0x0D))
        ));
        assert!(file.set::<()>(LAST_ADDRESS, 0xAA).is_ok());
        assert_eq!(file.get(LAST_ADDRESS), Some(0xAA));
    }

    #[test]
    fn conversion_finished_only_touches_its_bit() {
        let mut file = RegisterFile::new();
        file.write(Register::ConfigL, L_EN | AUTO_INC);
        file.set_conversion_finished(true);
        assert_eq!(file.read(Register::ConfigL), L_EN | AUTO_INC | CONV_FINISHED);
        file.set_conversion_finished(false);
        assert_eq!(file.read(Register::ConfigL), L_EN | AUTO_INC);
    }

    #[test]
    fn config_views_decode_bits() {
        let low = ConfigLow::from(R_EN | CONT_MODE | CONV_FINISHED);
        assert!(low.right_enabled);
        assert!(low.continuous);
        assert!(low.conversion_finished);
        assert!(!low.left_enabled);
        assert_eq!(u8::from(low), R_EN | CONT_MODE | CONV_FINISHED);

        let high = ConfigHigh::from(0b1011_0101);
        assert_eq!(high.interrupt_mode, 0b10);
        assert_eq!(high.duration, 0b11_0101);
        assert_eq!(u8::from(high), 0b1011_0101);
    }
}
