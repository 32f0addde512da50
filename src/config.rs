//! Typed settings for the Bus Pirate's binary I2C and SPI modes.

use std::time::Duration;

use bit_field::BitField;

/// Per-transaction timeout applied to the serial port once a bus mode is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(200);

/// Byte pushed into every page by an erase.
pub const DEFAULT_FILL: u8 = 0xBB;

/// Time a page write takes to commit inside the EEPROM (tWC of the 25xx parts).
pub const DEFAULT_WRITE_CYCLE: Duration = Duration::from_millis(5);

/// Power supply, pull-up, AUX and CS pin states (`0100wxyz`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, bon::Builder)]
pub struct Peripherals {
    #[builder(default)]
    pub power: bool,
    #[builder(default)]
    pub pullups: bool,
    #[builder(default)]
    pub aux: bool,
    #[builder(default)]
    pub chip_select: bool,
}

impl Peripherals {
    pub(crate) fn command(&self) -> u8 {
        let mut command = 0x40u8;
        command
            .set_bit(3, self.power)
            .set_bit(2, self.pullups)
            .set_bit(1, self.aux)
            .set_bit(0, self.chip_select);
        command
    }
}

/// Clock speeds supported in binary I2C mode (`011000ss`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum I2cSpeed {
    Khz5,
    Khz50,
    Khz100,
    Khz400,
}

impl I2cSpeed {
    pub(crate) fn command(&self) -> u8 {
        0x60 | *self as u8
    }
}

impl std::fmt::Display for I2cSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            I2cSpeed::Khz5 => "5kHz",
            I2cSpeed::Khz50 => "50kHz",
            I2cSpeed::Khz100 => "100kHz",
            I2cSpeed::Khz400 => "400kHz",
        })
    }
}

/// Clock speeds supported in binary SPI mode (`01100sss`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiSpeed {
    Khz30,
    Khz125,
    Khz250,
    Mhz1,
    Mhz2,
    Mhz2_6,
    Mhz4,
    Mhz8,
}

impl SpiSpeed {
    pub(crate) fn command(&self) -> u8 {
        0x60 | *self as u8
    }
}

impl std::fmt::Display for SpiSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SpiSpeed::Khz30 => "30kHz",
            SpiSpeed::Khz125 => "125kHz",
            SpiSpeed::Khz250 => "250kHz",
            SpiSpeed::Mhz1 => "1MHz",
            SpiSpeed::Mhz2 => "2MHz",
            SpiSpeed::Mhz2_6 => "2.6MHz",
            SpiSpeed::Mhz4 => "4MHz",
            SpiSpeed::Mhz8 => "8MHz",
        })
    }
}

/// SPI pin output type and clock settings (`1000wxyz`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, bon::Builder)]
pub struct SpiSettings {
    /// Drive outputs at 3.3V instead of open drain.
    #[builder(default)]
    pub output_3v3: bool,
    #[builder(default)]
    pub clock_idle_high: bool,
    /// Output changes on the active-to-idle clock transition.
    #[builder(default)]
    pub clock_edge_active_to_idle: bool,
    /// Sample input at the end of the data output time.
    #[builder(default)]
    pub sample_end: bool,
}

impl SpiSettings {
    pub(crate) fn command(&self) -> u8 {
        let mut command = 0x80u8;
        command
            .set_bit(3, self.output_3v3)
            .set_bit(2, self.clock_idle_high)
            .set_bit(1, self.clock_edge_active_to_idle)
            .set_bit(0, self.sample_end);
        command
    }
}

/// Settings applied when an I2C session is bootstrapped.
#[derive(Debug, Clone, bon::Builder)]
pub struct I2cConfig {
    #[builder(default = Peripherals::builder().power(true).pullups(true).build())]
    pub peripherals: Peripherals,
    #[builder(default = I2cSpeed::Khz400)]
    pub speed: I2cSpeed,
    #[builder(default = DEFAULT_TIMEOUT)]
    pub timeout: Duration,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Settings applied when an SPI session is bootstrapped.
///
/// The defaults are known to work with a 25LC640A.
#[derive(Debug, Clone, bon::Builder)]
pub struct SpiConfig {
    #[builder(default = Peripherals::builder().power(true).aux(true).chip_select(true).build())]
    pub peripherals: Peripherals,
    #[builder(default = SpiSpeed::Mhz1)]
    pub speed: SpiSpeed,
    #[builder(default = SpiSettings::builder().output_3v3(true).clock_idle_high(true).build())]
    pub settings: SpiSettings,
    #[builder(default = DEFAULT_TIMEOUT)]
    pub timeout: Duration,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Knobs for the SPI write and erase loops.
#[derive(Debug, Clone, bon::Builder)]
pub struct SpiOptions {
    #[builder(default = DEFAULT_FILL)]
    pub fill: u8,
    #[builder(default = DEFAULT_WRITE_CYCLE)]
    pub write_cycle: Duration,
}

impl Default for SpiOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}
