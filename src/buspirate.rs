use std::marker::PhantomData;
use std::time::Duration;

use log::{debug, warn};
use serialport::SerialPort;

use crate::bbio;
use crate::bus::{Ack, I2cPrimitives, SpiPrimitives};
use crate::config::{I2cSpeed, Peripherals, SpiSettings, SpiSpeed};
use crate::modes::{self, ActiveMode, BinaryMode, BusMode, Modes};
use crate::port::{self, Port};
use crate::Error;

/// A Bus Pirate reached over a serial port, in mode `M`.
///
/// Mode changes consume the value, so a handle can only offer the commands
/// valid in the mode the device is actually in.
///
/// The v3 firmware cannot report its settings back. Every setter instead
/// fails unless the Bus Pirate acknowledges the command with `0x01`.
pub struct BusPirate<M: ActiveMode, P: Port = Box<dyn SerialPort>> {
    _mode: PhantomData<M>,
    pub(crate) port: P,
}

/// Consume $this and return it with the new mode type.
macro_rules! with_mode {
    ($this:ident, $mode:ty) => {{
        let Self { port, .. } = $this;
        BusPirate::<$mode, P> {
            _mode: PhantomData,
            port,
        }
    }};
}

impl BusPirate<modes::Terminal> {
    /// Open the serial port. The device is left in its user terminal.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, Error> {
        Ok(Self::new(port::open(path, baud_rate)?))
    }
}

impl<P: Port> BusPirate<modes::Terminal, P> {
    pub fn new(port: P) -> Self {
        Self {
            _mode: PhantomData,
            port,
        }
    }

    /// Put the Bus Pirate into binary bit-bang mode.
    pub fn enter_bitbang(mut self) -> Result<BusPirate<modes::BitBang, P>, Error> {
        bbio::enter_bitbang(&mut self.port)?;
        debug!("Bus Pirate is in bit-bang mode");
        Ok(with_mode!(self, modes::BitBang))
    }
}

impl<P: Port> BusPirate<modes::BitBang, P> {
    fn enter(&mut self, expected: Modes) -> Result<(), Error> {
        match bbio::enter_mode(&mut self.port, expected)? {
            actual if actual == expected => Ok(()),
            actual => Err(Error::ModeMismatch { expected, actual }),
        }
    }

    /// Put the Bus Pirate into binary I2C mode.
    pub fn enter_i2c(mut self) -> Result<BusPirate<modes::I2c, P>, Error> {
        self.enter(Modes::I2c)?;
        Ok(with_mode!(self, modes::I2c))
    }

    /// Put the Bus Pirate into binary SPI mode.
    pub fn enter_spi(mut self) -> Result<BusPirate<modes::Spi, P>, Error> {
        self.enter(Modes::Spi)?;
        Ok(with_mode!(self, modes::Spi))
    }
}

impl<M: ActiveMode, P: Port> BusPirate<M, P> {
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<(), Error> {
        self.port.set_timeout(timeout)
    }
}

impl<M: BinaryMode, P: Port> BusPirate<M, P> {
    /// Return to bit-bang and reset the Bus Pirate to its user terminal.
    ///
    /// The serial port is closed when the handle is dropped afterwards.
    pub fn hw_reset(mut self) -> Result<(), Error> {
        bbio::exit_to_bitbang(&mut self.port)?;
        bbio::hardware_reset(&mut self.port)?;
        debug!("Bus Pirate reset to user terminal");
        Ok(())
    }
}

impl<M: BusMode, P: Port> BusPirate<M, P> {
    /// Switch the power supply, pull-ups, AUX and CS pins.
    pub fn configure(&mut self, peripherals: Peripherals) -> Result<(), Error> {
        bbio::command(&mut self.port, peripherals.command())
    }
}

impl<P: Port> BusPirate<modes::I2c, P> {
    pub fn set_speed(&mut self, speed: I2cSpeed) -> Result<(), Error> {
        bbio::command(&mut self.port, speed.command())
    }
}

impl<P: Port> I2cPrimitives for BusPirate<modes::I2c, P> {
    fn start_bit(&mut self) -> Result<(), Error> {
        bbio::command(&mut self.port, bbio::i2c::START)
    }

    fn stop_bit(&mut self) -> Result<(), Error> {
        bbio::command(&mut self.port, bbio::i2c::STOP)
    }

    fn bulk_write(&mut self, data: &[u8]) -> Result<Vec<Ack>, Error> {
        let mut acks = Vec::with_capacity(data.len());
        for chunk in data.chunks(bbio::MAX_BULK) {
            let replies = bbio::bulk(&mut self.port, chunk)?;
            acks.extend(replies.into_iter().map(Ack::from_reply));
        }
        Ok(acks)
    }

    fn read_byte(&mut self) -> Result<u8, Error> {
        bbio::read_byte(&mut self.port)
    }

    fn ack(&mut self) -> Result<(), Error> {
        bbio::command(&mut self.port, bbio::i2c::ACK)
    }

    fn nack(&mut self) -> Result<(), Error> {
        bbio::command(&mut self.port, bbio::i2c::NACK)
    }
}

impl<P: Port> BusPirate<modes::Spi, P> {
    pub fn set_speed(&mut self, speed: SpiSpeed) -> Result<(), Error> {
        bbio::command(&mut self.port, speed.command())
    }

    /// Set output type, clock polarity and edge, and sample point.
    pub fn set_settings(&mut self, settings: SpiSettings) -> Result<(), Error> {
        bbio::command(&mut self.port, settings.command())
    }
}

impl<P: Port> SpiPrimitives for BusPirate<modes::Spi, P> {
    fn bulk_transfer(&mut self, data: &[u8]) -> Result<Vec<u8>, Error> {
        let mut read = Vec::with_capacity(data.len());
        for chunk in data.chunks(bbio::MAX_BULK) {
            read.extend(bbio::bulk(&mut self.port, chunk)?);
        }
        Ok(read)
    }

    fn set_chip_select(&mut self, asserted: bool) -> Result<(), Error> {
        // CS is active low.
        let command = if asserted {
            bbio::spi::CS_LOW
        } else {
            bbio::spi::CS_HIGH
        };
        bbio::command(&mut self.port, command)
    }
}

impl Ack {
    fn from_reply(reply: u8) -> Self {
        match reply {
            0x00 => Ack::Ack,
            0x01 => Ack::Nack,
            other => {
                warn!("Unexpected I2C acknowledge byte 0x{other:02x}");
                Ack::Nack
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedPort;

    fn bitbang() -> ScriptedPort {
        ScriptedPort::new().exchange(&[0x00], b"BBIO1")
    }

    fn in_bitbang(port: ScriptedPort) -> BusPirate<modes::BitBang, ScriptedPort> {
        BusPirate::new(port)
            .enter_bitbang()
            .unwrap()
    }

    #[test]
    fn i2c_settings_are_sent_and_acknowledged() {
        let port = bitbang()
            .exchange(&[0x02], b"I2C1")
            .exchange(&[0x4C], &[0x01])
            .exchange(&[0x63], &[0x01]);
        let mut bp = in_bitbang(port).enter_i2c().unwrap();

        let peripherals = Peripherals::builder().power(true).pullups(true).build();
        bp.configure(peripherals).unwrap();
        bp.set_speed(I2cSpeed::Khz400).unwrap();
        bp.set_timeout(Duration::from_millis(200)).unwrap();

        assert_eq!(bp.port.timeouts, vec![Duration::from_millis(200)]);
        bp.port.finish();
    }

    #[test]
    fn refused_setting_is_an_error() {
        let port = bitbang()
            .exchange(&[0x01], b"SPI1")
            .exchange(&[0x8C], &[0x00]);
        let mut bp = in_bitbang(port).enter_spi().unwrap();
        let settings = SpiSettings::builder()
            .output_3v3(true)
            .clock_idle_high(true)
            .build();
        assert!(matches!(
            bp.set_settings(settings),
            Err(Error::UnexpectedResponse {
                command: 0x8C,
                response: 0x00
            })
        ));
        bp.port.finish();
    }

    #[test]
    fn wrong_mode_reply_is_a_mismatch() {
        let port = bitbang().exchange(&[0x01], b"I2C1");
        let result = in_bitbang(port).enter_spi();
        assert!(matches!(
            result,
            Err(Error::ModeMismatch {
                expected: Modes::Spi,
                actual: Modes::I2c
            })
        ));
    }

    #[test]
    fn i2c_primitives_frame_commands() {
        let port = bitbang()
            .exchange(&[0x02], b"I2C1")
            .exchange(&[0x02], &[0x01])
            .exchange(&[0x11, 0xA0, 0x00], &[0x01, 0x00, 0x01])
            .exchange(&[0x04], &[0x5A])
            .exchange(&[0x06], &[0x01])
            .exchange(&[0x07], &[0x01])
            .exchange(&[0x03], &[0x01]);
        let mut bp = in_bitbang(port).enter_i2c().unwrap();

        bp.start_bit().unwrap();
        assert_eq!(bp.bulk_write(&[0xA0, 0x00]).unwrap(), vec![Ack::Ack, Ack::Nack]);
        assert_eq!(bp.read_byte().unwrap(), 0x5A);
        bp.ack().unwrap();
        bp.nack().unwrap();
        bp.stop_bit().unwrap();
        bp.port.finish();
    }

    #[test]
    fn spi_transfer_splits_long_writes() {
        let mut first = vec![0x1F];
        first.extend([0xFF; 16]);
        let mut first_reply = vec![0x01];
        first_reply.extend(0..16u8);

        let port = bitbang()
            .exchange(&[0x01], b"SPI1")
            .exchange(&[0x02], &[0x01])
            .exchange(&first, &first_reply)
            .exchange(&[0x11, 0xFF, 0xFF], &[0x01, 16, 17])
            .exchange(&[0x03], &[0x01]);
        let mut bp = in_bitbang(port).enter_spi().unwrap();

        bp.set_chip_select(true).unwrap();
        let read = bp.bulk_transfer(&[0xFF; 18]).unwrap();
        assert_eq!(read, (0..18u8).collect::<Vec<_>>());
        bp.set_chip_select(false).unwrap();
        bp.port.finish();
    }

    #[test]
    fn reset_goes_through_bitbang() {
        let port = bitbang()
            .exchange(&[0x02], b"I2C1")
            .exchange(&[0x00], b"BBIO1")
            .exchange(&[0x0F], &[0x01]);
        let bp = in_bitbang(port).enter_i2c().unwrap();
        bp.hw_reset().unwrap();
    }
}
