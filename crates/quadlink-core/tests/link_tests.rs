//! Codec tests against a recording mock bus.
//!
//! The mock captures every transaction (endpoint, command, address, payload)
//! and returns configurable reply bytes per (endpoint, command) pair, so each
//! test can assert the exact wire traffic an operation produces — including
//! that guard-rejected operations produce none at all.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use quadlink_core::frame::{FRAMEBUFFER_SIZE_BYTES, PALETTE_SIZE_BYTES};
use quadlink_core::link::{FpgaLink, LinkError};
use quadlink_core::proto;
use quadlink_hal::{Endpoint, QspiBus};

/// Captured transaction.
#[derive(Debug, Clone)]
struct Transaction {
    endpoint: Endpoint,
    command: u8,
    address: u32,
    address_bits: u8,
    write: Vec<u8>,
    read_len: usize,
}

#[derive(Default)]
struct Inner {
    transactions: Vec<Transaction>,
    replies: Vec<(Endpoint, u8, Vec<u8>)>,
    queued_replies: VecDeque<(Endpoint, u8, Vec<u8>)>,
    fail_all: bool,
}

/// Recording mock bus with configurable replies.
#[derive(Clone)]
struct MockBus {
    inner: Rc<RefCell<Inner>>,
    max_transaction_bytes: usize,
}

#[derive(Debug)]
struct MockError;

impl MockBus {
    fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner::default())),
            max_transaction_bytes: 4092 * 4,
        }
    }

    fn with_max(max_transaction_bytes: usize) -> Self {
        Self { max_transaction_bytes, ..Self::new() }
    }

    fn set_reply(&self, endpoint: Endpoint, command: u8, bytes: &[u8]) {
        self.inner
            .borrow_mut()
            .replies
            .push((endpoint, command, bytes.to_vec()));
    }

    /// Queue a one-shot reply consumed (in FIFO order) before any persistent
    /// reply for the same endpoint/command.
    fn queue_reply(&self, endpoint: Endpoint, command: u8, bytes: &[u8]) {
        self.inner
            .borrow_mut()
            .queued_replies
            .push_back((endpoint, command, bytes.to_vec()));
    }

    fn fail_all(&self) {
        self.inner.borrow_mut().fail_all = true;
    }

    fn transactions(&self) -> Vec<Transaction> {
        self.inner.borrow().transactions.clone()
    }
}

impl QspiBus for MockBus {
    type Error = MockError;

    fn transact(
        &mut self,
        endpoint: Endpoint,
        command: u8,
        address: u32,
        address_bits: u8,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Self::Error> {
        let mut inner = self.inner.borrow_mut();

        if inner.fail_all {
            return Err(MockError);
        }

        inner.transactions.push(Transaction {
            endpoint,
            command,
            address,
            address_bits,
            write: write.to_vec(),
            read_len: read.len(),
        });

        if !read.is_empty() {
            let queued = inner
                .queued_replies
                .iter()
                .position(|(ep, cmd, _)| *ep == endpoint && *cmd == command);
            let bytes = match queued {
                Some(idx) => inner.queued_replies.remove(idx).map(|(_, _, b)| b),
                None => inner
                    .replies
                    .iter()
                    .rev()
                    .find(|(ep, cmd, _)| *ep == endpoint && *cmd == command)
                    .map(|(_, _, b)| b.clone()),
            };
            if let Some(bytes) = bytes {
                let n = read.len().min(bytes.len());
                read[..n].copy_from_slice(&bytes[..n]);
            }
        }

        Ok(())
    }

    fn max_transaction_bytes(&self) -> usize {
        self.max_transaction_bytes
    }
}

fn make_link() -> (FpgaLink<MockBus>, MockBus) {
    let bus = MockBus::new();
    let handle = bus.clone();
    (FpgaLink::new(bus), handle)
}

mod handshake_tests {
    use super::*;

    #[test]
    fn magic_number_match() {
        let (mut link, bus) = make_link();
        bus.set_reply(
            Endpoint::Gpu,
            proto::CMD_READ_MAGIC_NUMBER,
            &proto::MAGIC_NUMBER.to_be_bytes(),
        );

        assert!(link.read_magic_number().expect("bus ok"));

        let trans = bus.transactions();
        assert_eq!(trans.len(), 1);
        assert_eq!(trans[0].command, proto::CMD_READ_MAGIC_NUMBER);
        assert_eq!(trans[0].read_len, 2);
        assert!(trans[0].write.is_empty());
    }

    #[test]
    fn magic_number_mismatch() {
        let (mut link, bus) = make_link();
        bus.set_reply(Endpoint::Gpu, proto::CMD_READ_MAGIC_NUMBER, &[0xDE, 0xAD]);

        assert!(!link.read_magic_number().expect("bus ok"));
    }

    #[test]
    fn magic_number_bus_error_propagates() {
        let (mut link, bus) = make_link();
        bus.fail_all();

        assert!(matches!(link.read_magic_number(), Err(LinkError::Bus(_))));
    }
}

mod status_tests {
    use super::*;

    #[test]
    fn status0_bit_decode() {
        let (mut link, bus) = make_link();

        bus.set_reply(Endpoint::Gpu, proto::CMD_READ_STATUS0, &[0b0000_0010]);
        let status = link.read_status0().expect("bus ok");
        assert!(status.vblank());
        assert!(!status.hblank());

        bus.set_reply(Endpoint::Gpu, proto::CMD_READ_STATUS0, &[0b0000_0100]);
        let status = link.read_status0().expect("bus ok");
        assert!(!status.vblank());
        assert!(status.hblank());
    }

    #[test]
    fn output_enable_disable_are_command_only() {
        let (mut link, bus) = make_link();

        link.enable_output().expect("bus ok");
        link.disable_output().expect("bus ok");

        let trans = bus.transactions();
        assert_eq!(trans[0].command, proto::CMD_ENABLE_OUTPUT);
        assert_eq!(trans[1].command, proto::CMD_DISABLE_OUTPUT);
        for t in &trans {
            assert!(t.write.is_empty());
            assert_eq!(t.read_len, 0);
            assert_eq!(t.address_bits, 0);
        }
    }
}

mod palette_tests {
    use super::*;

    #[test]
    fn set_palette_sends_full_table() {
        let (mut link, bus) = make_link();
        let mut palette = [0u8; PALETTE_SIZE_BYTES];
        palette[0] = 0x11;
        palette[PALETTE_SIZE_BYTES - 1] = 0x22;

        link.set_palette(&palette).expect("bus ok");

        let trans = bus.transactions();
        assert_eq!(trans.len(), 1);
        assert_eq!(trans[0].command, proto::CMD_SET_PALETTE);
        assert_eq!(trans[0].write.len(), PALETTE_SIZE_BYTES);
        assert_eq!(trans[0].write[0], 0x11);
        assert_eq!(trans[0].write[PALETTE_SIZE_BYTES - 1], 0x22);
    }

    #[test]
    fn get_palette_reads_full_table() {
        let (mut link, bus) = make_link();
        let stored: Vec<u8> = (0..PALETTE_SIZE_BYTES).map(|i| (i % 251) as u8).collect();
        bus.set_reply(Endpoint::Gpu, proto::CMD_GET_PALETTE, &stored);

        let mut palette = [0u8; PALETTE_SIZE_BYTES];
        link.get_palette(&mut palette).expect("bus ok");

        assert_eq!(&palette[..], &stored[..]);
    }
}

mod framebuffer_tests {
    use super::*;

    #[test]
    fn write_rejects_out_of_range_start_without_bus_activity() {
        let (mut link, bus) = make_link();
        let pixels = [0u8; 16];

        let result = link.framebuffer_write(FRAMEBUFFER_SIZE_BYTES as u32, &pixels);

        assert!(matches!(
            result,
            Err(LinkError::PixelIndexOutOfRange { start_idx }) if start_idx == 76_800
        ));
        assert!(bus.transactions().is_empty(), "guard must fire before any bus access");
    }

    #[test]
    fn write_address_is_index_shifted_left_4() {
        let (mut link, bus) = make_link();
        let pixels = [0xABu8; 8];

        link.framebuffer_write(100, &pixels).expect("bus ok");

        let trans = bus.transactions();
        assert_eq!(trans.len(), 1);
        assert_eq!(trans[0].command, proto::CMD_FRAMEBUFFER_WRITE);
        assert_eq!(trans[0].address, 100 << 4);
        assert_eq!(trans[0].address_bits, 24);
        assert_eq!(trans[0].write, pixels.to_vec());
    }

    #[test]
    fn oversized_write_chunks_with_increasing_addresses() {
        let max = 1000;
        let bus = MockBus::with_max(max);
        let handle = bus.clone();
        let mut link = FpgaLink::new(bus);

        let pixels = vec![7u8; 2500];
        link.framebuffer_write(0, &pixels).expect("bus ok");

        let trans = handle.transactions();
        assert_eq!(trans.len(), 3, "ceil(2500/1000) transactions");
        assert_eq!(trans[0].address, 0);
        assert_eq!(trans[0].write.len(), 1000);
        assert_eq!(trans[1].address, 1000 << 4);
        assert_eq!(trans[1].write.len(), 1000);
        assert_eq!(trans[2].address, 2000 << 4);
        assert_eq!(trans[2].write.len(), 500);

        let mut last = None;
        for t in &trans {
            if let Some(prev) = last {
                assert!(t.address > prev, "chunk addresses strictly increase");
            }
            last = Some(t.address);
        }
    }

    #[test]
    fn wait_vblank_polls_end_then_start_then_writes() {
        let (mut link, bus) = make_link();

        // A vblank is in progress: the first loop must see it end before the
        // second loop waits for the next one to begin.
        let vb = [proto::STATUS0_VBLANK];
        bus.queue_reply(Endpoint::Gpu, proto::CMD_READ_STATUS0, &vb);
        bus.queue_reply(Endpoint::Gpu, proto::CMD_READ_STATUS0, &[0]);
        bus.queue_reply(Endpoint::Gpu, proto::CMD_READ_STATUS0, &[0]);
        bus.queue_reply(Endpoint::Gpu, proto::CMD_READ_STATUS0, &vb);

        let pixels = [1u8; 4];
        link.framebuffer_write_wait_vblank(0, &pixels).expect("bus ok");

        let trans = bus.transactions();
        let status_polls = trans
            .iter()
            .filter(|t| t.command == proto::CMD_READ_STATUS0)
            .count();
        assert_eq!(status_polls, 4, "polls for vblank end, then vblank start");
        assert_eq!(
            trans.last().expect("non-empty").command,
            proto::CMD_FRAMEBUFFER_WRITE,
            "pixel write happens only after the vblank edge"
        );
    }
}

mod audio_tests {
    use super::*;

    #[test]
    fn write_rejects_empty_payload_without_bus_activity() {
        let (mut link, bus) = make_link();

        assert!(matches!(
            link.audio_write(&[]),
            Err(LinkError::SampleCountOutOfRange { count: 0 })
        ));
        assert!(bus.transactions().is_empty());
    }

    #[test]
    fn write_rejects_over_256_samples_without_bus_activity() {
        let (mut link, bus) = make_link();
        let samples = vec![0u8; 257 * 4];

        assert!(matches!(
            link.audio_write(&samples),
            Err(LinkError::SampleCountOutOfRange { count: 257 })
        ));
        assert!(bus.transactions().is_empty());
    }

    #[test]
    fn write_rejects_ragged_payload() {
        let (mut link, bus) = make_link();
        let samples = [0u8; 10];

        assert!(matches!(
            link.audio_write(&samples),
            Err(LinkError::SampleCountOutOfRange { .. })
        ));
        assert!(bus.transactions().is_empty());
    }

    #[test]
    fn write_carries_count_in_address_and_reads_status() {
        let (mut link, bus) = make_link();
        bus.set_reply(Endpoint::Gpu, proto::CMD_AUDIO_WRITE, &[0x81, 0x40]);

        let samples = vec![0x55u8; 3 * 4];
        let status = link.audio_write(&samples).expect("bus ok");

        let trans = bus.transactions();
        assert_eq!(trans.len(), 1);
        assert_eq!(trans[0].command, proto::CMD_AUDIO_WRITE);
        assert_eq!(trans[0].address, 3);
        assert_eq!(trans[0].address_bits, 8);
        assert_eq!(trans[0].write.len(), 12);
        assert_eq!(trans[0].read_len, 2);
        assert_eq!(status.0, 0x8140);
        assert!(status.almost_full_latched());
        assert_eq!(status.fill(), 0x140);
    }

    #[test]
    fn full_batch_count_encodes_as_zero_address() {
        let (mut link, bus) = make_link();
        let samples = vec![0u8; 256 * 4];

        link.audio_write(&samples).expect("bus ok");

        // 256 & 0xFF == 0: hardware convention for a full batch.
        assert_eq!(bus.transactions()[0].address, 0);
    }

    #[test]
    fn status_word_decodes_flags_and_fill() {
        let (mut link, bus) = make_link();
        bus.set_reply(Endpoint::Gpu, proto::CMD_AUDIO_READ_STATUS, &[0xF3, 0xFF]);

        let status = link.audio_read_status().expect("bus ok");

        assert!(status.almost_full_latched());
        assert!(status.full_latched());
        assert!(status.almost_full());
        assert!(status.full());
        assert_eq!(status.fill(), 0x3FF);
    }
}

mod hid_tests {
    use super::*;

    #[test]
    fn status_read_uses_io_endpoint() {
        let (mut link, bus) = make_link();
        let mut block = [0u8; 24];
        block[5] = 0x02;
        bus.set_reply(Endpoint::Io, proto::CMD_HID_READ_STATUS, &block);

        let read = link.hid_read_status().expect("bus ok");

        let trans = bus.transactions();
        assert_eq!(trans.len(), 1);
        assert_eq!(trans[0].endpoint, Endpoint::Io);
        assert_eq!(trans[0].read_len, 24);
        assert_eq!(read[5], 0x02);
    }
}
