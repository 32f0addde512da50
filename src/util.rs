use std::fmt::Write as _;
use std::io::{self, Write};
use std::time::Duration;

use embedded_hal::delay::DelayNs;

/// Lowercase hex, no separators.
pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}

/// Writer that passes data through to `inner` and prints each write as a
/// hex line on `echo`.
///
/// The dump loops write one block per call, so each line is one block.
pub struct HexEcho<W, E> {
    inner: W,
    echo: E,
}

impl<W: Write, E: Write> HexEcho<W, E> {
    pub fn new(inner: W, echo: E) -> Self {
        Self { inner, echo }
    }
}

impl<W: Write, E: Write> Write for HexEcho<W, E> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write_all(buf)?;
        writeln!(self.echo, "{}", hex(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()?;
        self.echo.flush()
    }
}

/// Blocking delay on the host thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}
