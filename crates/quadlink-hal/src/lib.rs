#![no_std]

/// Selects one of the two chip-selected devices sharing the quad-wire bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Graphics device: framebuffer, palette, audio FIFO.
    Gpu,
    /// I/O bridge device: USB HID status block.
    Io,
}

/// Abstracts the half-duplex quad-lane command protocol over any bus
/// implementation.
///
/// Every transaction starts with an 8-bit command byte, followed by an
/// optional MSB-first address field (`address_bits` of 0, 8, or 24), all in
/// quad-lane mode. A write phase is issued when `write` is non-empty, or when
/// both buffers are empty (command-only transaction). A read phase is issued
/// when `read` is non-empty; the device inserts 2 dummy cycles before read
/// data. When both phases occur in one call, the read phase omits the
/// command and address fields — the device stays selected across both phases
/// and the whole call counts as one bus acquisition.
///
/// Implementations never retry; retry policy belongs to the caller.
/// Exclusive access per endpoint is enforced by the `&mut self` receiver.
pub trait QspiBus {
    type Error: core::fmt::Debug;

    /// Issue one (possibly two-phase) transaction on the given endpoint.
    fn transact(
        &mut self,
        endpoint: Endpoint,
        command: u8,
        address: u32,
        address_bits: u8,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Self::Error>;

    /// Largest payload a single transaction can carry, in bytes.
    ///
    /// Callers split larger transfers into chunks of at most this size;
    /// chunking must not change command semantics.
    fn max_transaction_bytes(&self) -> usize;
}
