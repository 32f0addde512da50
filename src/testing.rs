//! In-memory stand-in for the serial link, used by the unit tests.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::time::Duration;

use crate::port::Port;
use crate::Error;

struct Exchange {
    expect: Vec<u8>,
    reply: Vec<u8>,
}

/// Port that checks every byte written against a script and only makes a
/// reply readable once the request it answers has been written in full.
/// Reading with nothing buffered times out, like a quiet serial line.
#[derive(Default)]
pub(crate) struct ScriptedPort {
    script: VecDeque<Exchange>,
    pending: Vec<u8>,
    rx: VecDeque<u8>,
    pub(crate) timeouts: Vec<Duration>,
}

impl ScriptedPort {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn exchange(mut self, expect: &[u8], reply: &[u8]) -> Self {
        self.script.push_back(Exchange {
            expect: expect.to_vec(),
            reply: reply.to_vec(),
        });
        self
    }

    /// Assert the whole script was played out.
    pub(crate) fn finish(&self) {
        assert!(self.pending.is_empty(), "unmatched bytes {:02x?}", self.pending);
        let left: Vec<_> = self.script.iter().map(|e| &e.expect).collect();
        assert!(left.is_empty(), "exchanges never happened: {left:02x?}");
    }
}

impl Read for ScriptedPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.rx.is_empty() {
            return Err(io::ErrorKind::TimedOut.into());
        }
        let n = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for ScriptedPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &byte in buf {
            self.pending.push(byte);
            let Some(next) = self.script.front() else {
                panic!("unexpected write {:02x?}", self.pending);
            };
            assert!(
                next.expect.starts_with(&self.pending),
                "expected {:02x?}, got {:02x?}",
                next.expect,
                self.pending
            );
            if next.expect.len() == self.pending.len() {
                let exchange = self.script.pop_front().expect("checked above");
                self.rx.extend(exchange.reply);
                self.pending.clear();
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Port for ScriptedPort {
    fn set_timeout(&mut self, timeout: Duration) -> Result<(), Error> {
        self.timeouts.push(timeout);
        Ok(())
    }

    fn discard_input(&mut self) -> Result<(), Error> {
        self.rx.clear();
        Ok(())
    }
}
