//! Read, program, erase and identify a 25xx SPI EEPROM.
//!
//! Chip-select must already be asserted; every command here relies on
//! toggling it to latch the previous one.

use std::io::{Read, Write};

use embedded_hal::delay::DelayNs;
use log::{debug, info};

use crate::bus::SpiPrimitives;
use crate::config::SpiOptions;
use crate::confirm::Confirm;
use crate::transfer::{PageAddress, TransferRequest, PAGE_SIZE};
use crate::Error;

pub const READ: u8 = 0x03;
pub const WRITE_ENABLE: u8 = 0x06;
pub const PAGE_PROGRAM: u8 = 0x02;
pub const READ_STATUS: u8 = 0x05;

/// Clocked out while reading.
const DUMMY: u8 = 0xFF;

/// Pads the last page of a write that does not fill it.
const PAD: u8 = 0xFF;

/// What happened to a destructive operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The user said no; nothing was sent to the chip.
    Declined,
    Completed { pages: usize },
}

/// Raw status register reply, shown as lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status(pub [u8; 2]);

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&crate::util::hex(&self.0))
    }
}

/// Stream `size` bytes from address 0 into `sink`.
///
/// The read command is sent once; the chip then keeps shifting out
/// consecutive bytes for as long as chip-select stays asserted.
pub fn read<B, W>(bus: &mut B, size: usize, mut sink: W) -> Result<(), Error>
where
    B: SpiPrimitives + ?Sized,
    W: Write,
{
    info!("Reading EEPROM ({size} bytes)");
    bus.bulk_transfer(&[READ, 0x00, 0x00])?;

    let dummy = [DUMMY; PAGE_SIZE];
    for block in TransferRequest::pages(size).blocks() {
        let data = bus.bulk_transfer(&dummy[..block.len])?;
        sink.write_all(&data)?;
    }
    sink.flush()?;
    Ok(())
}

/// Program `pages` starting at page 0, one 16 byte page write each.
fn program<'a, B, D>(
    bus: &mut B,
    pages: impl Iterator<Item = &'a [u8]>,
    delay: &mut D,
    options: &SpiOptions,
) -> Result<usize, Error>
where
    B: SpiPrimitives + ?Sized,
    D: DelayNs,
{
    let write_cycle_us = u32::try_from(options.write_cycle.as_micros()).unwrap_or(u32::MAX);

    let mut count = 0;
    for (index, data) in pages.enumerate() {
        let address = PageAddress::for_page(index)?;
        debug!("Page {index} at row {} column {}", address.row, address.column);

        let mut page = [PAD; PAGE_SIZE];
        page[..data.len()].copy_from_slice(data);

        bus.bulk_transfer(&[WRITE_ENABLE])?;
        bus.toggle_chip_select()?;
        let [high, low] = address.bytes();
        bus.bulk_transfer(&[PAGE_PROGRAM, high, low])?;
        bus.bulk_transfer(&page)?;
        bus.toggle_chip_select()?;
        delay.delay_us(write_cycle_us);
        count += 1;
    }
    Ok(count)
}

fn check_reachable(pages: usize) -> Result<(), Error> {
    match pages.checked_sub(1) {
        Some(last) => PageAddress::for_page(last).map(drop),
        None => Ok(()),
    }
}

/// Overwrite the start of the chip with the whole of `source`.
///
/// The source is read completely before asking for confirmation. A trailing
/// partial page is padded with 0xFF.
pub fn write<B, R, C, D>(
    bus: &mut B,
    mut source: R,
    confirm: &mut C,
    delay: &mut D,
    options: &SpiOptions,
) -> Result<Outcome, Error>
where
    B: SpiPrimitives + ?Sized,
    R: Read,
    C: Confirm + ?Sized,
    D: DelayNs,
{
    let mut data = Vec::new();
    source.read_to_end(&mut data)?;
    check_reachable(data.len().div_ceil(PAGE_SIZE))?;

    let prompt = format!(
        "Are you sure to overwrite the first {} bytes of the chip?",
        data.len()
    );
    if !confirm.confirm(&prompt)? {
        info!("Ok, not doing anything");
        return Ok(Outcome::Declined);
    }

    info!("Writing EEPROM ({} bytes)", data.len());
    let pages = program(bus, data.chunks(PAGE_SIZE), delay, options)?;
    Ok(Outcome::Completed { pages })
}

/// Fill the first `size` bytes (rounded up to whole pages) with `options.fill`.
pub fn erase<B, C, D>(
    bus: &mut B,
    size: usize,
    confirm: &mut C,
    delay: &mut D,
    options: &SpiOptions,
) -> Result<Outcome, Error>
where
    B: SpiPrimitives + ?Sized,
    C: Confirm + ?Sized,
    D: DelayNs,
{
    let request = TransferRequest::pages(size);
    check_reachable(request.block_count())?;

    let prompt = format!("Are you sure to clear the first {size} bytes of the chip?");
    if !confirm.confirm(&prompt)? {
        info!("Ok, not doing anything");
        return Ok(Outcome::Declined);
    }

    info!("Erasing EEPROM with 0x{:02x}", options.fill);
    let fill = [options.fill; PAGE_SIZE];
    let pages = std::iter::repeat(&fill[..]).take(request.block_count());
    let pages = program(bus, pages, delay, options)?;
    Ok(Outcome::Completed { pages })
}

/// Read the status register in a single 2 byte transaction.
pub fn identify<B: SpiPrimitives + ?Sized>(bus: &mut B) -> Result<Status, Error> {
    let reply = bus.bulk_transfer(&[READ_STATUS, 0x00])?;
    match reply[..] {
        [first, second] => Ok(Status([first, second])),
        _ => Err(Error::ShortReply {
            expected: 2,
            actual: reply.len(),
        }),
    }
}
