//! Bus primitives the transfer loops are written against.
//!
//! [`crate::BusPirate`] implements these over the serial link; tests swap in
//! recorders.

use crate::Error;

/// Acknowledge bit returned for each byte written on the I2C bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    Ack,
    Nack,
}

pub trait I2cPrimitives {
    fn start_bit(&mut self) -> Result<(), Error>;
    fn stop_bit(&mut self) -> Result<(), Error>;
    /// Clock `data` out and report the acknowledge bit of every byte.
    fn bulk_write(&mut self, data: &[u8]) -> Result<Vec<Ack>, Error>;
    fn read_byte(&mut self) -> Result<u8, Error>;
    fn ack(&mut self) -> Result<(), Error>;
    fn nack(&mut self) -> Result<(), Error>;
}

pub trait SpiPrimitives {
    /// Full-duplex transfer: clock `data` out and return what was clocked in.
    fn bulk_transfer(&mut self, data: &[u8]) -> Result<Vec<u8>, Error>;
    fn set_chip_select(&mut self, asserted: bool) -> Result<(), Error>;

    /// Release then re-assert chip-select, latching the preceding command.
    fn toggle_chip_select(&mut self) -> Result<(), Error> {
        self.set_chip_select(false)?;
        self.set_chip_select(true)
    }
}
