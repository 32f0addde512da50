//! Bringing a Bus Pirate up into a configured bus mode, and resetting it
//! afterwards.
//!
//! The v3 has no way to read settings back. Each configuration command is
//! checked by its `0x01` acknowledgement instead, and a refusal ends the
//! bootstrap.

use log::{error, info, warn};

use crate::bus::SpiPrimitives;
use crate::config::{I2cConfig, SpiConfig};
use crate::modes::{self, BinaryMode};
use crate::port::{self, Port};
use crate::{BusPirate, Error};

/// Open the serial port for a Bus Pirate, autodetecting it when `device` is `None`.
pub fn connect(device: Option<&str>, baud_rate: u32) -> Result<BusPirate<modes::Terminal>, Error> {
    let path = port::resolve(device)?;
    info!("Connecting to {path} at {baud_rate} baud");
    BusPirate::open(&path, baud_rate)
}

fn bitbang<P: Port>(bp: BusPirate<modes::Terminal, P>) -> Result<BusPirate<modes::BitBang, P>, Error> {
    info!("Entering bitbang mode");
    let bp = bp.enter_bitbang()?;
    info!("OK");
    Ok(bp)
}

/// Enter I2C mode and apply `config`.
pub fn start_i2c<P: Port>(
    bp: BusPirate<modes::Terminal, P>,
    config: &I2cConfig,
) -> Result<BusPirate<modes::I2c, P>, Error> {
    let bp = bitbang(bp)?;

    info!("Entering raw I2C mode");
    let mut bp = bp.enter_i2c()?;
    info!("OK");

    info!(
        "Configuring I2C (power, pull-ups, {} and timeout)",
        config.speed
    );
    bp.configure(config.peripherals)?;
    bp.set_speed(config.speed)?;
    bp.set_timeout(config.timeout)?;
    Ok(bp)
}

/// Enter SPI mode, apply `config` and assert chip-select.
pub fn start_spi<P: Port>(
    bp: BusPirate<modes::Terminal, P>,
    config: &SpiConfig,
) -> Result<BusPirate<modes::Spi, P>, Error> {
    let bp = bitbang(bp)?;

    info!("Entering raw SPI mode");
    let mut bp = bp.enter_spi()?;
    info!("OK");

    info!("Configuring SPI peripherals");
    bp.configure(config.peripherals)?;
    info!("Configuring SPI speed ({})", config.speed);
    bp.set_speed(config.speed)?;
    info!("Configuring SPI configuration");
    bp.set_settings(config.settings)?;
    bp.set_chip_select(true)?;
    bp.set_timeout(config.timeout)?;
    Ok(bp)
}

/// Result of the reset attempted at the end of a session.
#[derive(Debug)]
pub enum ResetOutcome {
    Reset,
    Failed(Error),
}

impl ResetOutcome {
    pub fn is_reset(&self) -> bool {
        matches!(self, ResetOutcome::Reset)
    }
}

/// Reset the Bus Pirate to its user terminal. Failure is logged, not returned.
pub fn teardown<M: BinaryMode, P: Port>(bp: BusPirate<M, P>) -> ResetOutcome {
    info!("Reset Bus Pirate to user terminal");
    match bp.hw_reset() {
        Ok(()) => {
            info!("OK");
            ResetOutcome::Reset
        }
        Err(e) => {
            error!("Failed: {e}");
            ResetOutcome::Failed(e)
        }
    }
}

/// Release chip-select, then reset.
pub fn teardown_spi<P: Port>(mut bp: BusPirate<modes::Spi, P>) -> ResetOutcome {
    if let Err(e) = bp.set_chip_select(false) {
        warn!("Could not release chip-select: {e}");
    }
    teardown(bp)
}
