//! Dump and program I2C and SPI EEPROMs through a classic Bus Pirate (v3,
//! binary "BBIO" mode).
//!
//! [`BusPirate`] owns the serial link and tracks the device mode in its type.
//! The EEPROM loops in [`i2c_eeprom`] and [`spi_eeprom`] only need the
//! primitives in [`bus`], so they can run against anything implementing them.

mod bbio;
pub mod bus;
mod buspirate;
pub mod command;
pub mod config;
pub mod confirm;
mod error;
pub mod i2c_eeprom;
pub mod logging;
pub mod modes;
pub mod port;
pub mod session;
pub mod spi_eeprom;
#[cfg(test)]
mod testing;
pub mod transfer;
pub mod util;

pub use buspirate::BusPirate;
pub use error::Error;
