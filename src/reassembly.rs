//! Reassembly of video frames from isochronous payloads.
//!
//! Every isochronous packet starts with a UVC payload header. Its bit field
//! carries a frame ID that toggles between frames and an end-of-frame flag.
//! [`Reassembler`] strips the header, appends the payload to the frame being
//! received and, once a frame is complete, swaps the two caller-provided
//! buffers so the finished frame can be read while the next one is written.
//!
//! The consumer hands a finished frame back with [`Reassembler::rearm`].
//! Until then no further swap happens: a completed frame stalls reception
//! instead of overwriting the frame being read.

use log::trace;

use crate::config::{VideoFormat, RX_FIFO_SIZE};

/// Length of the payload header. Bytes past it are frame data.
pub const PAYLOAD_HEADER_SIZE: usize = 12;

const HEADER_BIT_FIELD: usize = 1;
const HEADER_FID: u8 = 1 << 0;
const HEADER_EOF: u8 = 1 << 1;

/// Packet counters of a stream.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Every packet handed to the reassembler.
    pub packets: u32,

    /// Packets carrying frame data.
    pub data_packets: u32,

    /// Packets with nothing past the payload header.
    pub header_packets: u32,

    /// Completed frames handed to the consumer.
    pub frames: u32,
}

/// Double-buffered frame assembly.
pub struct Reassembler<'buf> {
    format: VideoFormat,
    frame_size: usize,

    buffers: Option<[&'buf mut [u8]; 2]>,
    use_index: usize,

    stats: StreamStats,
    cur_len: usize,
    filled_len: usize,
    prev_fid: u8,

    initialized: bool,
    new_frame: bool,
    switch_ready: bool,
    enabled: bool,
    sof: bool,
    eof: bool,
}

/// Length check on received packets. Both bounds can't hold at once, so no
/// packet is ever rejected here.
#[allow(clippy::impossible_comparisons)]
fn rejected_length(len: usize) -> bool {
    len < 2 && len > RX_FIFO_SIZE
}

impl<'buf> Reassembler<'buf> {
    /// Reassembler for `format`, accumulating at most `frame_size` bytes per
    /// frame. It drops everything until [`init`][Self::init] binds buffers.
    pub fn new(format: VideoFormat, frame_size: usize) -> Self {
        Reassembler {
            format,
            frame_size,
            buffers: None,
            use_index: 0,
            stats: StreamStats::default(),
            cur_len: 0,
            filled_len: 0,
            prev_fid: 0,
            initialized: false,
            new_frame: false,
            switch_ready: false,
            enabled: false,
            sof: false,
            eof: false,
        }
    }

    /// Bind the two frame buffers and start accepting payloads.
    ///
    /// `buf0` receives the first frame. Any partially assembled frame is
    /// discarded; the counters are kept.
    pub fn init(&mut self, buf0: &'buf mut [u8], buf1: &'buf mut [u8]) {
        *self = Reassembler {
            buffers: Some([buf0, buf1]),
            stats: self.stats,
            initialized: true,
            enabled: true,
            switch_ready: true,
            eof: true,
            ..Reassembler::new(self.format, self.frame_size)
        };
    }

    /// Bytes a frame may grow to before further payload is dropped.
    fn capacity(&self) -> usize {
        match &self.buffers {
            Some([b0, b1]) => self.frame_size.min(b0.len()).min(b1.len()),
            None => 0,
        }
    }

    /// Handle one received isochronous packet, header included.
    pub fn process_packet(&mut self, packet: &[u8]) {
        self.stats.packets = self.stats.packets.wrapping_add(1);

        if rejected_length(packet.len()) {
            return;
        }

        if !self.enabled || !self.initialized {
            self.switch_buffers();
            self.eof = false;
            return;
        }

        if packet.len() <= PAYLOAD_HEADER_SIZE {
            self.stats.header_packets = self.stats.header_packets.wrapping_add(1);
            return;
        }
        self.stats.data_packets = self.stats.data_packets.wrapping_add(1);

        let bits = packet[HEADER_BIT_FIELD];
        let fid = bits & HEADER_FID;
        if fid != self.prev_fid && self.eof {
            self.cur_len = 0;
            self.sof = true;
        }
        self.prev_fid = fid;

        self.append(&packet[PAYLOAD_HEADER_SIZE..]);

        if bits & HEADER_EOF != 0 {
            self.eof = true;

            if !self.sof {
                trace!("end of frame without start, dropping {} bytes", self.cur_len);
                self.cur_len = 0;
                return;
            }

            if self.format == VideoFormat::Mjpeg {
                self.enabled = false;
                self.switch_buffers();
            }
        } else {
            self.eof = false;
        }

        if self.format == VideoFormat::Yuy2 && self.cur_len >= self.frame_size {
            if !self.sof {
                return;
            }
            self.switch_buffers();
        }
    }

    /// Append to the frame being assembled. A chunk that doesn't fit is
    /// dropped whole and the frame is marked full.
    fn append(&mut self, data: &[u8]) {
        let capacity = self.capacity();
        let end = self.cur_len + data.len();
        if end > capacity {
            self.cur_len = capacity;
            return;
        }
        if let Some(buffers) = &mut self.buffers {
            buffers[self.use_index][self.cur_len..end].copy_from_slice(data);
        }
        self.cur_len = end;
    }

    /// Publish the frame being assembled if the consumer is done with the
    /// previous one, otherwise stop receiving until it is.
    fn switch_buffers(&mut self) {
        if !self.switch_ready || self.buffers.is_none() {
            trace!("frame buffer still in use, reception paused");
            self.enabled = false;
            return;
        }

        self.use_index ^= 1;
        self.new_frame = true;
        self.switch_ready = false;
        self.enabled = true;
        self.sof = false;
        self.filled_len = self.cur_len;
        self.cur_len = 0;
        self.stats.frames = self.stats.frames.wrapping_add(1);
        trace!("frame {} complete, {} bytes", self.stats.frames, self.filled_len);
    }

    /// Hand the filled buffer back, allowing the next completed frame to
    /// replace it.
    pub fn rearm(&mut self) {
        self.new_frame = false;
        self.switch_ready = true;
    }

    /// Whether a frame was completed since the last [`rearm`][Self::rearm].
    pub fn new_frame(&self) -> bool {
        self.new_frame
    }

    /// The most recently completed frame.
    pub fn filled_frame(&self) -> &[u8] {
        match &self.buffers {
            Some(buffers) => &buffers[self.use_index ^ 1][..self.filled_len],
            None => &[],
        }
    }

    /// The most recently completed frame, for in-place processing.
    pub fn filled_frame_mut(&mut self) -> &mut [u8] {
        let filled_len = self.filled_len;
        match &mut self.buffers {
            Some(buffers) => &mut buffers[self.use_index ^ 1][..filled_len],
            None => &mut [],
        }
    }

    /// Length of the most recently completed frame.
    pub fn frame_len(&self) -> usize {
        self.filled_len
    }

    /// Bytes accumulated for the frame in progress.
    pub fn pending_len(&self) -> usize {
        self.cur_len
    }

    /// Whether payloads are currently being accepted.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }
}

impl std::fmt::Debug for Reassembler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reassembler")
            .field("format", &self.format)
            .field("frame_size", &self.frame_size)
            .field("initialized", &self.initialized)
            .field("enabled", &self.enabled)
            .field("switch_ready", &self.switch_ready)
            .field("new_frame", &self.new_frame)
            .field("cur_len", &self.cur_len)
            .field("filled_len", &self.filled_len)
            .field("stats", &self.stats)
            .finish()
    }
}
