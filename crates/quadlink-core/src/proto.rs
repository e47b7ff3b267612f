//! Wire-protocol constants for the FPGA command set.
//!
//! Command byte layout: bit 7 = write phase present, bit 6 = read phase
//! present (both set for write-then-read). The remaining bits select the
//! operation. These encodings are fixed by the FPGA bitstream and must match
//! exactly.

/// Status read, 1-byte reply (blanking flags).
pub const CMD_READ_STATUS0: u8 = 0b0100_0000;
/// Capability handshake, 2-byte reply compared against [`MAGIC_NUMBER`].
pub const CMD_READ_MAGIC_NUMBER: u8 = 0b0110_0000;
/// Disable video/audio output.
pub const CMD_DISABLE_OUTPUT: u8 = 0b0000_0000;
/// Enable video/audio output.
pub const CMD_ENABLE_OUTPUT: u8 = 0b0000_0001;
/// Continuous framebuffer write: 24-bit pixel-index address, then pixel data
/// in 1-byte blocks until the master ends the transaction.
pub const CMD_FRAMEBUFFER_WRITE: u8 = 0b1000_0010;
/// Palette upload, 256*3 bytes starting from entry 0.
pub const CMD_SET_PALETTE: u8 = 0b1000_0011;
/// Palette readback, 256*3 bytes starting from entry 0.
pub const CMD_GET_PALETTE: u8 = 0b0100_0011;
/// Audio FIFO status read, 2-byte reply.
pub const CMD_AUDIO_READ_STATUS: u8 = 0b0101_0000;
/// Audio buffer write: 8-bit sample-count address, count*4 payload bytes,
/// then a 2-byte status reply in the same transaction.
pub const CMD_AUDIO_WRITE: u8 = 0b1101_0001;
/// HID status read on the I/O endpoint, 24-byte reply.
pub const CMD_HID_READ_STATUS: u8 = 0b0101_0000;

/// Value returned by [`CMD_READ_MAGIC_NUMBER`] when the FPGA is present and
/// initialized. Sent big-endian on the wire.
pub const MAGIC_NUMBER: u16 = 0b1010_0101_1100_0011;

/// Status0 bit: vertical blank in progress.
pub const STATUS0_VBLANK: u8 = 0b0000_0010;
/// Status0 bit: horizontal blank in progress.
pub const STATUS0_HBLANK: u8 = 0b0000_0100;

/// Framebuffer addresses are the pixel index left-shifted by this amount.
pub const FRAMEBUFFER_ADDR_SHIFT: u32 = 4;
/// Framebuffer writes carry a 24-bit address field.
pub const FRAMEBUFFER_ADDR_BITS: u8 = 24;
/// Audio writes carry the sample count as an 8-bit address field.
pub const AUDIO_COUNT_ADDR_BITS: u8 = 8;

/// Dummy cycles the device inserts between address/command completion and
/// read data. Transports must program this for every read phase.
pub const READ_DUMMY_CYCLES: u8 = 2;

/// Decoded 1-byte status reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Status0(pub u8);

impl Status0 {
    pub fn vblank(self) -> bool {
        self.0 & STATUS0_VBLANK != 0
    }

    pub fn hblank(self) -> bool {
        self.0 & STATUS0_HBLANK != 0
    }
}

/// Decoded 16-bit audio FIFO status word.
///
/// Bits 15/14 are latched almost-full/full flags, bits 13/12 the live
/// versions, bits 11..0 the current FIFO fill in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AudioStatus(pub u16);

impl AudioStatus {
    /// Almost-full occurred since the last status read.
    pub fn almost_full_latched(self) -> bool {
        self.0 & 0b1000_0000_0000_0000 != 0
    }

    /// Full occurred since the last status read.
    pub fn full_latched(self) -> bool {
        self.0 & 0b0100_0000_0000_0000 != 0
    }

    pub fn almost_full(self) -> bool {
        self.0 & 0b0010_0000_0000_0000 != 0
    }

    pub fn full(self) -> bool {
        self.0 & 0b0001_0000_0000_0000 != 0
    }

    /// Number of samples currently queued in the FIFO.
    pub fn fill(self) -> u16 {
        self.0 & 0x0FFF
    }
}
