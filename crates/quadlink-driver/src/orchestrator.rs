//! The timer-driven poll loop that multiplexes the bus.
//!
//! One tick services the whole link: vblank-edge frame presentation, audio
//! FIFO drain/refill, and HID status polling. `tick()` is synchronous and
//! side-effect-complete so the loop body can be driven directly in tests.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use quadlink_core::audio::{MAX_WRITE_BYTES, REFILL_THRESHOLD_SAMPLES};
use quadlink_core::hid::HidStatus;
use quadlink_core::link::FpgaLink;
use quadlink_hal::QspiBus;

use crate::state::Shared;

pub(crate) struct Orchestrator<B: QspiBus> {
    link: FpgaLink<B>,
    shared: Arc<Shared>,
    prev_vblank: bool,
    /// Linked ticks serviced so far; HID is polled on alternating ticks.
    ticks: u64,
}

impl<B: QspiBus> Orchestrator<B> {
    pub fn new(bus: B, shared: Arc<Shared>) -> Self {
        Self {
            link: FpgaLink::new(bus),
            shared,
            prev_vblank: false,
            ticks: 0,
        }
    }

    /// Wait for timer wakes and service one tick per wake, forever.
    pub fn run(mut self) {
        loop {
            self.shared.tick_wake.wait();
            self.tick();
        }
    }

    /// Service one timer tick.
    ///
    /// Any bus failure is logged and the affected step behaves as if it read
    /// nothing; the per-tick cadence itself is the retry policy.
    pub fn tick(&mut self) {
        if !self.shared.connected.load(Ordering::Acquire) {
            self.try_establish_link();
            return;
        }

        self.ticks = self.ticks.wrapping_add(1);

        match self.link.read_status0() {
            Ok(status) => {
                let vblank = status.vblank();
                if !self.prev_vblank && vblank {
                    self.present_pending();
                }
                self.prev_vblank = vblank;
            }
            Err(e) => log::warn!("status read failed: {:?}", e),
        }

        self.service_audio();

        // HID devices report far below the tick rate.
        if self.ticks % 2 == 0 {
            self.poll_hid();
        }
    }

    /// Handshake until the FPGA answers with the magic number. The link flag
    /// only ever transitions false -> true; a peripheral reset mid-session is
    /// not detected at this layer.
    fn try_establish_link(&mut self) {
        match self.link.read_magic_number() {
            Ok(true) => {
                if let Err(e) = self.link.enable_output() {
                    log::warn!("output enable failed: {:?}", e);
                }
                self.shared.connected.store(true, Ordering::Release);
                log::info!("fpga link established");
            }
            Ok(false) => {}
            Err(e) => log::warn!("link handshake failed: {:?}", e),
        }
    }

    /// Push the pending frame to the hardware. Called only on a vblank edge,
    /// the one point where a frame may change.
    fn present_pending(&mut self) {
        let frame = {
            let mut st = self.shared.state.lock().unwrap();
            match st.pending.take() {
                Some(frame) => {
                    st.presenting = true;
                    frame
                }
                None => return,
            }
        };

        // Bus transfers happen with the lock released; `presenting` keeps
        // present requests from completing meanwhile.
        if let Err(e) = self.link.set_palette(&frame.palette) {
            log::warn!("palette upload failed: {:?}", e);
        }
        if let Err(e) = self.link.framebuffer_write(0, &frame.pixels[..]) {
            log::warn!("framebuffer upload failed: {:?}", e);
        }

        let mut st = self.shared.state.lock().unwrap();
        st.displayed = Some(frame);
        st.presenting = false;
    }

    /// Drain the staging buffer into the hardware FIFO (or just refresh the
    /// fill count), then decide whether the producer should generate more.
    fn service_audio(&mut self) {
        // Copy staged bytes out under the lock; the ready count stays set so
        // the producer cannot republish until this write lands.
        let staged = {
            let st = self.shared.state.lock().unwrap();
            st.staging.staged().map(|bytes| {
                let mut buf = [0u8; MAX_WRITE_BYTES];
                buf[..bytes.len()].copy_from_slice(bytes);
                (buf, bytes.len())
            })
        };

        let fill = match staged {
            Some((buf, len)) => match self.link.audio_write(&buf[..len]) {
                Ok(status) => {
                    let mut st = self.shared.state.lock().unwrap();
                    st.staging.clear();
                    st.fifo_fill = status.fill();
                    Some(status.fill())
                }
                Err(e) => {
                    // Staged samples stay put and retry next tick.
                    log::warn!("audio write failed: {:?}", e);
                    None
                }
            },
            None => match self.link.audio_read_status() {
                Ok(status) => {
                    let mut st = self.shared.state.lock().unwrap();
                    st.fifo_fill = status.fill();
                    Some(status.fill())
                }
                Err(e) => {
                    log::warn!("audio status read failed: {:?}", e);
                    None
                }
            },
        };

        if let Some(fill) = fill {
            if (fill as usize) <= REFILL_THRESHOLD_SAMPLES {
                self.shared.audio_wake.raise();
            }
        }
    }

    /// Refresh the HID snapshot and wake the synthesizer on change.
    fn poll_hid(&mut self) {
        let block = match self.link.hid_read_status() {
            Ok(block) => block,
            Err(e) => {
                log::warn!("hid status read failed: {:?}", e);
                return;
            }
        };

        let status = HidStatus::parse(&block);
        let changed = {
            let mut st = self.shared.state.lock().unwrap();
            if st.hid_current != status {
                st.hid_current = status;
                true
            } else {
                false
            }
        };

        if changed {
            self.shared.hid_wake.raise();
        }
    }
}
