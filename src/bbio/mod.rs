//! Classic Bus Pirate binary ("BBIO") protocol framing.
//!
//! Every function here is a single request/response exchange. Mode state is
//! tracked by [`crate::BusPirate`], not here.

use std::io::{self, Read, Write};

use log::trace;

use crate::modes::Modes;
use crate::port::Port;
use crate::Error;

/// Number of `0x00` bytes sent before giving up on bit-bang mode.
const BITBANG_ATTEMPTS: usize = 20;

/// Bytes read per attempt before sending the next `0x00` regardless.
const BITBANG_ATTEMPT_BYTES: usize = 64;

/// Largest payload accepted by a single bulk command.
pub(crate) const MAX_BULK: usize = 16;

const OK: u8 = 0x01;
const RESET: u8 = 0x0F;

pub(crate) mod i2c {
    pub(crate) const START: u8 = 0x02;
    pub(crate) const STOP: u8 = 0x03;
    pub(crate) const READ_BYTE: u8 = 0x04;
    pub(crate) const ACK: u8 = 0x06;
    pub(crate) const NACK: u8 = 0x07;
}

pub(crate) mod spi {
    pub(crate) const CS_LOW: u8 = 0x02;
    pub(crate) const CS_HIGH: u8 = 0x03;
}

const BULK: u8 = 0x10;

fn read_reply(mut port: impl Read, len: usize) -> Result<Vec<u8>, Error> {
    let mut reply = vec![0u8; len];
    port.read_exact(&mut reply).map_err(|e| match e.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::UnexpectedEof => {
            Error::Timeout
        }
        _ => Error::Io(e),
    })?;
    Ok(reply)
}

fn send(mut port: impl Read + Write, request: &[u8], reply_len: usize) -> Result<Vec<u8>, Error> {
    trace!("-> {request:02x?}");
    port.write_all(request)?;
    port.flush()?;
    let reply = read_reply(&mut port, reply_len)?;
    trace!("<- {reply:02x?}");
    Ok(reply)
}

/// Send a one byte command the Bus Pirate answers with `0x01`.
pub(crate) fn command(port: impl Read + Write, command: u8) -> Result<(), Error> {
    match send(port, &[command], 1)?[..] {
        [OK] => Ok(()),
        [response] => Err(Error::UnexpectedResponse { command, response }),
        _ => unreachable!("reply length is fixed"),
    }
}

/// Read one byte off the I2C bus.
pub(crate) fn read_byte(port: impl Read + Write) -> Result<u8, Error> {
    Ok(send(port, &[i2c::READ_BYTE], 1)?[0])
}

/// Bulk command (`0001xxxx`): `data` is clocked out, the status byte is
/// checked, and the per-byte replies are returned.
///
/// In SPI mode the replies are the bytes read back; in I2C mode they are
/// `0x00` for ACK and `0x01` for NACK.
pub(crate) fn bulk(port: impl Read + Write, data: &[u8]) -> Result<Vec<u8>, Error> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    if data.len() > MAX_BULK {
        return Err(Error::BulkTooLong(data.len()));
    }

    let command = BULK | (data.len() - 1) as u8;
    let mut request = Vec::with_capacity(data.len() + 1);
    request.push(command);
    request.extend_from_slice(data);

    let mut reply = send(port, &request, data.len() + 1)?;
    match reply[0] {
        OK => Ok(reply.split_off(1)),
        response => Err(Error::UnexpectedResponse { command, response }),
    }
}

/// Escape the user terminal into bit-bang mode.
///
/// `0x00` is repeated until `BBIO1` comes back; the Bus Pirate needs up to
/// twenty of them depending on what it was doing.
pub(crate) fn enter_bitbang(port: &mut impl Port) -> Result<(), Error> {
    let expect = Modes::BitBang.reply();
    port.discard_input()?;

    let mut matched = 0;
    let mut byte = [0u8];
    'attempts: for attempt in 0..BITBANG_ATTEMPTS {
        trace!("bit-bang attempt {attempt}");
        port.write_all(&[0x00])?;
        port.flush()?;

        for _ in 0..BITBANG_ATTEMPT_BYTES {
            match port.read(&mut byte) {
                Ok(0) => continue 'attempts,
                Ok(_) => {
                    if byte[0] != expect[matched] {
                        matched = 0;
                    }
                    if byte[0] == expect[matched] {
                        matched += 1;
                        if matched == expect.len() {
                            port.discard_input()?;
                            return Ok(());
                        }
                    }
                }
                Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                    continue 'attempts
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Err(Error::BitbangHandshake)
}

/// Switch from bit-bang into `mode` and return the mode the Bus Pirate reports.
pub(crate) fn enter_mode(port: impl Read + Write, mode: Modes) -> Result<Modes, Error> {
    let reply = send(port, &[mode.entry_command()], mode.reply().len())?;
    String::from_utf8_lossy(&reply).parse()
}

/// Leave the current bus mode for bit-bang.
pub(crate) fn exit_to_bitbang(port: impl Read + Write) -> Result<(), Error> {
    let expect = Modes::BitBang.reply();
    let reply = send(port, &[0x00], expect.len())?;
    match String::from_utf8_lossy(&reply).parse::<Modes>()? {
        Modes::BitBang => Ok(()),
        actual => Err(Error::ModeMismatch {
            expected: Modes::BitBang,
            actual,
        }),
    }
}

/// Reset the Bus Pirate back to the user terminal. Only valid from bit-bang.
pub(crate) fn hardware_reset(port: impl Read + Write) -> Result<(), Error> {
    command(port, RESET)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedPort;

    #[test]
    fn bitbang_handshake_tolerates_terminal_noise() {
        let mut port = ScriptedPort::new()
            .exchange(&[0x00], b"")
            .exchange(&[0x00], b"HiZ>")
            .exchange(&[0x00], b"BBIO1");
        enter_bitbang(&mut port).unwrap();
        port.finish();
    }

    #[test]
    fn bitbang_handshake_gives_up() {
        let mut port = ScriptedPort::new();
        for _ in 0..BITBANG_ATTEMPTS {
            port = port.exchange(&[0x00], b"");
        }
        assert!(matches!(
            enter_bitbang(&mut port),
            Err(Error::BitbangHandshake)
        ));
        port.finish();
    }

    /// Answers every read with the same byte, forever.
    struct Chatty;

    impl Read for Chatty {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            buf.fill(b'$');
            Ok(buf.len())
        }
    }

    impl Write for Chatty {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Port for Chatty {
        fn set_timeout(&mut self, _: std::time::Duration) -> Result<(), Error> {
            Ok(())
        }

        fn discard_input(&mut self) -> Result<(), Error> {
            Ok(())
        }
    }

    #[test]
    fn bitbang_handshake_gives_up_on_a_chatty_port() {
        assert!(matches!(
            enter_bitbang(&mut Chatty),
            Err(Error::BitbangHandshake)
        ));
    }

    #[test]
    fn enter_mode_reports_what_the_device_says() {
        let mut port = ScriptedPort::new().exchange(&[0x02], b"I2C1");
        assert_eq!(enter_mode(&mut port, Modes::I2c).unwrap(), Modes::I2c);

        let mut port = ScriptedPort::new().exchange(&[0x01], b"I2C1");
        assert_eq!(enter_mode(&mut port, Modes::Spi).unwrap(), Modes::I2c);

        let mut port = ScriptedPort::new().exchange(&[0x01], b"ART1");
        assert!(matches!(
            enter_mode(&mut port, Modes::Spi),
            Err(Error::UnknownMode(reply)) if reply == "ART1"
        ));
    }

    #[test]
    fn command_checks_status() {
        let mut port = ScriptedPort::new().exchange(&[0x63], &[0x01]);
        command(&mut port, 0x63).unwrap();

        let mut port = ScriptedPort::new().exchange(&[0x63], &[0x00]);
        assert!(matches!(
            command(&mut port, 0x63),
            Err(Error::UnexpectedResponse {
                command: 0x63,
                response: 0x00
            })
        ));
    }

    #[test]
    fn silence_is_a_timeout() {
        let mut port = ScriptedPort::new().exchange(&[0x63], b"");
        assert!(matches!(command(&mut port, 0x63), Err(Error::Timeout)));
    }

    #[test]
    fn bulk_frames_length() {
        let mut port =
            ScriptedPort::new().exchange(&[0x12, 0xAA, 0xBB, 0xCC], &[0x01, 0x10, 0x20, 0x30]);
        assert_eq!(
            bulk(&mut port, &[0xAA, 0xBB, 0xCC]).unwrap(),
            vec![0x10, 0x20, 0x30]
        );
        port.finish();
    }

    #[test]
    fn bulk_limits() {
        let mut port = ScriptedPort::new();
        assert!(bulk(&mut port, &[]).unwrap().is_empty());
        assert!(matches!(
            bulk(&mut port, &[0u8; 17]),
            Err(Error::BulkTooLong(17))
        ));
        port.finish();
    }
}
