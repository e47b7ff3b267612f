//! Audio staging: the single-slot handoff area between the sample producer
//! and the bus-writing step of the poll loop.

/// Depth of the hardware audio FIFO behind the graphics endpoint, in samples.
pub const FIFO_CAPACITY_SAMPLES: usize = 1024;
/// Largest sample count one audio write transaction can carry.
pub const MAX_WRITE_SAMPLES: usize = 256;
/// Wire size of a full write batch.
pub const MAX_WRITE_BYTES: usize = MAX_WRITE_SAMPLES * 4;
/// Output sample rate of the audio path.
pub const SAMPLE_RATE_HZ: u32 = 48_000;

/// Safety margin kept on top of one full producer batch when deciding
/// whether the FIFO has room for more samples.
pub const REFILL_MARGIN_SAMPLES: usize = 10;
/// FIFO fill at or below which the producer is asked for more samples.
pub const REFILL_THRESHOLD_SAMPLES: usize =
    FIFO_CAPACITY_SAMPLES - MAX_WRITE_SAMPLES - REFILL_MARGIN_SAMPLES;

/// Pack one interleaved stereo frame (low 16 bits = left channel, high 16
/// bits = right) into the wire's big-endian 32-bit format.
pub fn pack_sample(sample: u32) -> [u8; 4] {
    sample.to_be_bytes()
}

/// Single-slot staging buffer holding 0..=256 samples in wire byte order.
///
/// `ready` is the only field written by both the producer and the drain
/// side; all access happens under the driver's exclusion region, and a new
/// batch is accepted only once the previous one has been drained.
pub struct StagingBuffer {
    bytes: [u8; MAX_WRITE_BYTES],
    ready: usize,
}

impl StagingBuffer {
    pub const fn new() -> Self {
        Self { bytes: [0; MAX_WRITE_BYTES], ready: 0 }
    }

    /// Number of staged samples awaiting transmission.
    pub fn ready_samples(&self) -> usize {
        self.ready
    }

    pub fn is_empty(&self) -> bool {
        self.ready == 0
    }

    /// Stage a batch of samples. Returns false (leaving the slot untouched)
    /// if a previous batch is still unconsumed or the batch does not fit.
    /// The ready count is set only after the payload is in place.
    pub fn publish(&mut self, samples: &[u32]) -> bool {
        if self.ready != 0 || samples.is_empty() || samples.len() > MAX_WRITE_SAMPLES {
            return false;
        }

        for (i, &sample) in samples.iter().enumerate() {
            self.bytes[i * 4..i * 4 + 4].copy_from_slice(&pack_sample(sample));
        }
        self.ready = samples.len();

        true
    }

    /// The staged wire bytes, if any.
    pub fn staged(&self) -> Option<&[u8]> {
        if self.ready == 0 {
            None
        } else {
            Some(&self.bytes[..self.ready * 4])
        }
    }

    /// Mark the staged batch as consumed.
    pub fn clear(&mut self) {
        self.ready = 0;
    }
}

impl Default for StagingBuffer {
    fn default() -> Self {
        Self::new()
    }
}
