use crate::modes::Modes;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out waiting for the Bus Pirate to respond")]
    Timeout,

    #[error("no serial port found, pass one with --device")]
    NoSerialPort,

    #[error("Bus Pirate did not enter bit-bang mode")]
    BitbangHandshake,

    #[error("unrecognised mode reply {0:?}")]
    UnknownMode(String),

    #[error("expected {expected} mode, Bus Pirate reports {actual}")]
    ModeMismatch { expected: Modes, actual: Modes },

    #[error("unexpected response 0x{response:02x} to command 0x{command:02x}")]
    UnexpectedResponse { command: u8, response: u8 },

    #[error("expected {expected} reply bytes, got {actual}")]
    ShortReply { expected: usize, actual: usize },

    #[error("bulk transfer of {0} bytes exceeds the 16 byte limit")]
    BulkTooLong(usize),

    #[error("block {0} is beyond the addressable range of the device")]
    AddressOutOfRange(usize),

    #[error("only one of --read, --write, --erase and --id may be given")]
    ConflictingCommands,
}
