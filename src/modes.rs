mod sealed {
    pub trait Sealed {}
}

/// Typestate marker for the mode the Bus Pirate is currently in.
pub trait ActiveMode: sealed::Sealed {}

/// Modes reached through the binary protocol, from which a hardware reset is possible.
pub trait BinaryMode: ActiveMode {}

/// Binary modes that drive a bus and accept peripheral configuration.
pub trait BusMode: BinaryMode {}

macro_rules! impl_mode {
    ($mode:ident) => {
        impl sealed::Sealed for $mode {}
        impl ActiveMode for $mode {}
    };
}

/// User terminal mode, before the binary protocol has been entered.
pub struct Terminal;
impl_mode!(Terminal);

pub struct BitBang;
impl_mode!(BitBang);
impl BinaryMode for BitBang {}

pub struct I2c;
impl_mode!(I2c);
impl BinaryMode for I2c {}
impl BusMode for I2c {}

pub struct Spi;
impl_mode!(Spi);
impl BinaryMode for Spi {}
impl BusMode for Spi {}

/// Binary modes as reported by the Bus Pirate in its mode-entry reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modes {
    BitBang,
    Spi,
    I2c,
}

impl Modes {
    /// Mode tag, lower case.
    pub fn name(&self) -> &'static str {
        match self {
            Modes::BitBang => "bitbang",
            Modes::Spi => "spi",
            Modes::I2c => "i2c",
        }
    }

    /// Command that switches from bit-bang into this mode.
    pub(crate) fn entry_command(&self) -> u8 {
        match self {
            Modes::BitBang => 0x00,
            Modes::Spi => 0x01,
            Modes::I2c => 0x02,
        }
    }

    /// Reply sent by the Bus Pirate once it has switched into this mode.
    pub(crate) fn reply(&self) -> &'static [u8] {
        match self {
            Modes::BitBang => b"BBIO1",
            Modes::Spi => b"SPI1",
            Modes::I2c => b"I2C1",
        }
    }
}

impl std::fmt::Display for Modes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Modes {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "BBIO1" => Self::BitBang,
            "SPI1" => Self::Spi,
            "I2C1" => Self::I2c,
            other => return Err(crate::Error::UnknownMode(other.to_owned())),
        })
    }
}
