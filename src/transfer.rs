//! Block partitioning and per-block addressing shared by the dump loops.

use std::num::NonZeroUsize;

use crate::Error;

/// Write-page size of the 25xx SPI parts, and the SPI read chunk.
pub const PAGE_SIZE: usize = 16;

const PAGE_BLOCK: NonZeroUsize = NonZeroUsize::MIN.saturating_add(PAGE_SIZE - 1);

/// How many bytes to move and in what block size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    size: usize,
    block_size: NonZeroUsize,
}

impl TransferRequest {
    pub fn new(size: usize, block_size: NonZeroUsize) -> Self {
        Self { size, block_size }
    }

    /// Request split into 16 byte pages.
    pub fn pages(size: usize) -> Self {
        Self::new(size, PAGE_BLOCK)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn block_size(&self) -> usize {
        self.block_size.get()
    }

    pub fn full_blocks(&self) -> usize {
        self.size / self.block_size()
    }

    /// Length of the trailing partial block, if there is one.
    pub fn remainder(&self) -> Option<usize> {
        Some(self.size % self.block_size()).filter(|&rem| rem != 0)
    }

    /// Total number of blocks, partial block included.
    pub fn block_count(&self) -> usize {
        self.size.div_ceil(self.block_size())
    }

    pub fn blocks(&self) -> Blocks {
        Blocks {
            request: *self,
            next: 0,
        }
    }
}

/// The byte range `[offset, offset + len)` moved by one iteration of a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub index: usize,
    pub offset: usize,
    pub len: usize,
}

#[derive(Debug, Clone)]
pub struct Blocks {
    request: TransferRequest,
    next: usize,
}

impl Iterator for Blocks {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        let index = self.next;
        let offset = index
            .checked_mul(self.request.block_size())
            .filter(|&offset| offset < self.request.size)?;
        self.next += 1;
        Some(Block {
            index,
            offset,
            len: self.request.block_size().min(self.request.size - offset),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.request.block_count().saturating_sub(self.next);
        (left, Some(left))
    }
}

impl ExactSizeIterator for Blocks {}

/// I2C addresses of a 24xx EEPROM block.
///
/// The block index lands in the low bits of the device address: each block
/// appears as its own device at `0xA0 + (k << 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cAddress {
    pub write: u8,
    pub read: u8,
}

impl I2cAddress {
    pub const BASE_WRITE: u8 = 0xA0;
    pub const BASE_READ: u8 = 0xA1;

    pub fn for_block(index: usize) -> Result<Self, Error> {
        let offset = index
            .checked_mul(2)
            .and_then(|offset| u8::try_from(offset).ok())
            .ok_or(Error::AddressOutOfRange(index))?;
        let read = Self::BASE_READ
            .checked_add(offset)
            .ok_or(Error::AddressOutOfRange(index))?;
        Ok(Self {
            write: Self::BASE_WRITE + offset,
            read,
        })
    }
}

/// Location of a 16 byte page, as the (row, column) pair sent after the
/// page program opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageAddress {
    pub row: u8,
    pub column: u8,
}

impl PageAddress {
    pub fn for_page(index: usize) -> Result<Self, Error> {
        let row = u8::try_from(index / PAGE_SIZE).map_err(|_| Error::AddressOutOfRange(index))?;
        Ok(Self {
            row,
            column: (index % PAGE_SIZE) as u8,
        })
    }

    /// Address bytes: high byte is the row, low byte the column's first byte.
    pub fn bytes(&self) -> [u8; 2] {
        [self.row, self.column * PAGE_SIZE as u8]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(size: usize, block_size: usize) -> TransferRequest {
        TransferRequest::new(size, NonZeroUsize::new(block_size).unwrap())
    }

    #[test]
    fn exact_multiple_has_no_remainder() {
        let req = request(16, 16);
        assert_eq!(req.full_blocks(), 1);
        assert_eq!(req.remainder(), None);
        assert_eq!(
            req.blocks().collect::<Vec<_>>(),
            vec![Block {
                index: 0,
                offset: 0,
                len: 16
            }]
        );
    }

    #[test]
    fn partial_block_comes_last() {
        let req = request(20, 16);
        assert_eq!(req.full_blocks(), 1);
        assert_eq!(req.remainder(), Some(4));
        let blocks: Vec<_> = req.blocks().collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].index, 1);
        assert_eq!((blocks[1].offset, blocks[1].len), (16, 4));
    }

    #[test]
    fn huge_block_size_stops_instead_of_overflowing() {
        let block_size = usize::MAX / 2 + 1;
        let req = request(usize::MAX, block_size);
        let blocks: Vec<_> = req.blocks().collect();
        assert_eq!(blocks.len(), req.block_count());
        assert_eq!(blocks[1].offset, block_size);
        assert_eq!(blocks[1].len, usize::MAX - block_size);
    }

    #[test]
    fn empty_request_has_no_blocks() {
        let req = request(0, 256);
        assert_eq!(req.blocks().count(), 0);
        assert_eq!(req.remainder(), None);
    }

    #[test]
    fn blocks_cover_every_byte_once() {
        for size in [1, 15, 255, 256, 257, 1000, 2048] {
            for block_size in [1, 7, 16, 256] {
                let req = request(size, block_size);
                let blocks: Vec<_> = req.blocks().collect();
                assert_eq!(blocks.len(), req.block_count());
                assert_eq!(req.blocks().len(), req.block_count());
                assert_eq!(
                    blocks.len(),
                    req.full_blocks() + usize::from(req.remainder().is_some())
                );
                let mut expected_offset = 0;
                for block in &blocks {
                    assert_eq!(block.offset, expected_offset);
                    expected_offset += block.len;
                }
                assert_eq!(expected_offset, size);
            }
        }
    }

    #[test]
    fn i2c_addresses_step_by_two() {
        assert_eq!(
            I2cAddress::for_block(0).unwrap(),
            I2cAddress {
                write: 0xA0,
                read: 0xA1
            }
        );
        assert_eq!(
            I2cAddress::for_block(7).unwrap(),
            I2cAddress {
                write: 0xAE,
                read: 0xAF
            }
        );
        assert_eq!(I2cAddress::for_block(47).unwrap().read, 0xFF);
        assert!(matches!(
            I2cAddress::for_block(48),
            Err(Error::AddressOutOfRange(48))
        ));
    }

    #[test]
    fn page_addresses_split_row_and_column() {
        let first = PageAddress::for_page(0).unwrap();
        let second = PageAddress::for_page(1).unwrap();
        assert_eq!((first.row, first.column), (0, 0));
        assert_eq!((second.row, second.column), (0, 1));
        assert_eq!(second.bytes(), [0x00, 0x10]);
        assert_eq!(PageAddress::for_page(17).unwrap().bytes(), [0x01, 0x10]);
        assert_eq!(PageAddress::for_page(4095).unwrap().bytes(), [0xFF, 0xF0]);
        assert!(PageAddress::for_page(4096).is_err());
    }
}
