//! Command codec: maps semantic operations onto bus transactions.
//!
//! Each method is a thin, total mapping from one operation of the FPGA
//! command set to a single [`QspiBus::transact`] call, except framebuffer
//! writes which chunk at the transport's transaction ceiling.

use quadlink_hal::{Endpoint, QspiBus};

use crate::audio::MAX_WRITE_SAMPLES;
use crate::frame::{FRAMEBUFFER_SIZE_BYTES, PALETTE_SIZE_BYTES};
use crate::hid::HID_STATUS_BLOCK_LEN;
use crate::proto::{self, AudioStatus, Status0};

/// Error type for link operations, generic over transport errors.
#[derive(Debug)]
pub enum LinkError<E: core::fmt::Debug> {
    /// Framebuffer write starting beyond the 320x240 index space.
    PixelIndexOutOfRange { start_idx: u32 },
    /// Audio write with a sample count outside [1, 256] or a payload that is
    /// not a whole number of 4-byte samples.
    SampleCountOutOfRange { count: usize },
    /// Underlying bus error.
    Bus(E),
}

impl<E: core::fmt::Debug> From<E> for LinkError<E> {
    fn from(e: E) -> Self {
        LinkError::Bus(e)
    }
}

/// Owns the bus and speaks the FPGA command protocol on both endpoints.
pub struct FpgaLink<B: QspiBus> {
    bus: B,
}

impl<B: QspiBus> FpgaLink<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Read the blanking status byte from the graphics endpoint.
    pub fn read_status0(&mut self) -> Result<Status0, LinkError<B::Error>> {
        let mut buf = [0u8; 1];
        self.bus
            .transact(Endpoint::Gpu, proto::CMD_READ_STATUS0, 0, 0, &[], &mut buf)?;
        Ok(Status0(buf[0]))
    }

    /// Capability handshake: true only when the device returns the exact
    /// magic number, meaning the FPGA is present and its bitstream is up.
    pub fn read_magic_number(&mut self) -> Result<bool, LinkError<B::Error>> {
        let mut buf = [0u8; 2];
        self.bus.transact(
            Endpoint::Gpu,
            proto::CMD_READ_MAGIC_NUMBER,
            0,
            0,
            &[],
            &mut buf,
        )?;
        Ok(u16::from_be_bytes(buf) == proto::MAGIC_NUMBER)
    }

    pub fn enable_output(&mut self) -> Result<(), LinkError<B::Error>> {
        self.bus
            .transact(Endpoint::Gpu, proto::CMD_ENABLE_OUTPUT, 0, 0, &[], &mut [])?;
        Ok(())
    }

    pub fn disable_output(&mut self) -> Result<(), LinkError<B::Error>> {
        self.bus
            .transact(Endpoint::Gpu, proto::CMD_DISABLE_OUTPUT, 0, 0, &[], &mut [])?;
        Ok(())
    }

    /// Upload the full 256-entry RGB palette.
    pub fn set_palette(
        &mut self,
        palette: &[u8; PALETTE_SIZE_BYTES],
    ) -> Result<(), LinkError<B::Error>> {
        self.bus
            .transact(Endpoint::Gpu, proto::CMD_SET_PALETTE, 0, 0, palette, &mut [])?;
        Ok(())
    }

    /// Read back the full palette.
    pub fn get_palette(
        &mut self,
        palette: &mut [u8; PALETTE_SIZE_BYTES],
    ) -> Result<(), LinkError<B::Error>> {
        self.bus
            .transact(Endpoint::Gpu, proto::CMD_GET_PALETTE, 0, 0, &[], palette)?;
        Ok(())
    }

    /// Write pixel data starting at `start_idx`, chunked at the transport's
    /// transaction ceiling. The address auto-increments by the chunk size, so
    /// chunking is invisible to the device.
    ///
    /// Rejects a start index beyond the framebuffer before any bus activity.
    pub fn framebuffer_write(
        &mut self,
        mut start_idx: u32,
        mut pixels: &[u8],
    ) -> Result<(), LinkError<B::Error>> {
        if start_idx as usize >= FRAMEBUFFER_SIZE_BYTES {
            return Err(LinkError::PixelIndexOutOfRange { start_idx });
        }

        let max = self.bus.max_transaction_bytes();

        while !pixels.is_empty() {
            let chunk = pixels.len().min(max);
            self.bus.transact(
                Endpoint::Gpu,
                proto::CMD_FRAMEBUFFER_WRITE,
                start_idx << proto::FRAMEBUFFER_ADDR_SHIFT,
                proto::FRAMEBUFFER_ADDR_BITS,
                &pixels[..chunk],
                &mut [],
            )?;
            pixels = &pixels[chunk..];
            start_idx += chunk as u32;
        }

        Ok(())
    }

    /// Busy-poll until any in-progress vblank ends, then until the next one
    /// begins, then write the pixels. Blocks for a hardware-determined (but
    /// typically sub-frame) duration; keep it off the poll loop's hot path.
    pub fn framebuffer_write_wait_vblank(
        &mut self,
        start_idx: u32,
        pixels: &[u8],
    ) -> Result<(), LinkError<B::Error>> {
        while self.read_status0()?.vblank() {}
        while !self.read_status0()?.vblank() {}

        self.framebuffer_write(start_idx, pixels)
    }

    /// Read the audio FIFO status word.
    pub fn audio_read_status(&mut self) -> Result<AudioStatus, LinkError<B::Error>> {
        let mut buf = [0u8; 2];
        self.bus.transact(
            Endpoint::Gpu,
            proto::CMD_AUDIO_READ_STATUS,
            0,
            0,
            &[],
            &mut buf,
        )?;
        Ok(AudioStatus(u16::from_be_bytes(buf)))
    }

    /// Write staged samples (already in wire byte order, 4 bytes each) to the
    /// audio FIFO and return the status word from the same transaction.
    ///
    /// The sample count rides in the 8-bit address field; a count of 256
    /// encodes as 0 on the wire. Counts outside [1, 256] and ragged payloads
    /// are rejected before any bus activity.
    pub fn audio_write(&mut self, samples: &[u8]) -> Result<AudioStatus, LinkError<B::Error>> {
        let count = samples.len() / 4;

        if samples.len() % 4 != 0 || count == 0 || count > MAX_WRITE_SAMPLES {
            return Err(LinkError::SampleCountOutOfRange { count });
        }

        let mut reply = [0u8; 2];
        self.bus.transact(
            Endpoint::Gpu,
            proto::CMD_AUDIO_WRITE,
            count as u32 & 0xFF,
            proto::AUDIO_COUNT_ADDR_BITS,
            samples,
            &mut reply,
        )?;
        Ok(AudioStatus(u16::from_be_bytes(reply)))
    }

    /// Read the raw 24-byte HID status block from the I/O endpoint.
    pub fn hid_read_status(
        &mut self,
    ) -> Result<[u8; HID_STATUS_BLOCK_LEN], LinkError<B::Error>> {
        let mut buf = [0u8; HID_STATUS_BLOCK_LEN];
        self.bus
            .transact(Endpoint::Io, proto::CMD_HID_READ_STATUS, 0, 0, &[], &mut buf)?;
        Ok(buf)
    }
}
