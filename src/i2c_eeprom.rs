//! Block-wise dump of a 24xx I2C EEPROM.

use std::io::Write;

use log::{debug, info, warn};

use crate::bus::{Ack, I2cPrimitives};
use crate::transfer::{I2cAddress, TransferRequest};
use crate::Error;

/// Write `data` as one framed transaction: start, bytes, stop.
fn write_data<B: I2cPrimitives + ?Sized>(bus: &mut B, data: &[u8]) -> Result<(), Error> {
    bus.start_bit()?;
    let acks = bus.bulk_write(data)?;
    for (byte, _) in data.iter().zip(acks).filter(|(_, ack)| *ack == Ack::Nack) {
        warn!("Byte 0x{byte:02x} was not acknowledged");
    }
    bus.stop_bit()
}

/// Address the device for reading and clock out `len` bytes, ACKing all
/// but the last, which is NACKed to end the read.
fn read_bytes<B: I2cPrimitives + ?Sized>(
    bus: &mut B,
    address: u8,
    len: usize,
) -> Result<Vec<u8>, Error> {
    bus.start_bit()?;
    if bus.bulk_write(&[address])?.first() == Some(&Ack::Nack) {
        warn!("Read address 0x{address:02x} was not acknowledged");
    }

    let mut data = Vec::with_capacity(len);
    for remaining in (1..=len).rev() {
        data.push(bus.read_byte()?);
        if remaining > 1 {
            bus.ack()?;
        }
    }
    bus.nack()?;
    bus.stop_bit()?;
    Ok(data)
}

/// Dump `request.size()` bytes into `sink`, one addressed block at a time.
///
/// Each block first rewinds the device's address pointer to the start of
/// the block, then reads it. The trailing partial block, if any, is
/// addressed from its own block index like every other block. Returns the
/// number of bytes written to the sink.
///
/// Any error aborts the dump; blocks already written to the sink stay there.
pub fn dump<B, W>(bus: &mut B, request: &TransferRequest, mut sink: W) -> Result<usize, Error>
where
    B: I2cPrimitives + ?Sized,
    W: Write,
{
    // Refuse requests the addressing cannot reach before touching the bus.
    if let Some(last) = request.block_count().checked_sub(1) {
        I2cAddress::for_block(last)?;
    }

    info!("Dumping {} bytes out of the EEPROM", request.size());
    let mut written = 0;
    for block in request.blocks() {
        info!("Reading block {}", block.index);
        let address = I2cAddress::for_block(block.index)?;
        debug!(
            "Block {} at 0x{:02x}/0x{:02x}, {} bytes",
            block.index, address.write, address.read, block.len
        );

        write_data(bus, &[address.write, 0x00])?;
        let data = read_bytes(bus, address.read, block.len)?;
        sink.write_all(&data)?;
        written += data.len();
    }
    sink.flush()?;
    Ok(written)
}
