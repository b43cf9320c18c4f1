//! Descriptor fixtures and a simulated host stack shared by the unit tests.

use std::{collections::VecDeque, task::Poll};

use crate::{
    class::{subclass, terminal, vc, vs, CLASS_VIDEO, DESCRIPTOR_TYPE_CS_INTERFACE},
    error::TransferError,
    host::{Channel, ChannelConfig, HostStack},
    probe::PROBE_COMMIT_LEN,
    transfer::{request, ControlType, Direction, SetupPacket, Speed, UrbStatus},
};

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Builds a configuration descriptor blob one descriptor at a time.
pub(crate) struct ConfigBuilder {
    buf: Vec<u8>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        ConfigBuilder { buf: Vec::new() }
    }

    fn cs(&mut self, subtype: u8, body: &[u8]) {
        self.buf.push(3 + body.len() as u8);
        self.buf.push(DESCRIPTOR_TYPE_CS_INTERFACE);
        self.buf.push(subtype);
        self.buf.extend_from_slice(body);
    }

    pub fn interface(&mut self, number: u8, alt: u8, subclass: u8, num_endpoints: u8) {
        self.buf
            .extend_from_slice(&[9, 0x04, number, alt, num_endpoints, CLASS_VIDEO, subclass, 0, 0]);
    }

    pub fn endpoint(&mut self, address: u8, attributes: u8, max_packet_size: u16, interval: u8) {
        let [lo, hi] = max_packet_size.to_le_bytes();
        self.buf
            .extend_from_slice(&[7, 0x05, address, attributes, lo, hi, interval]);
    }

    pub fn vc_header(&mut self, version: u16, streaming_interface: u8) {
        let mut body = Vec::new();
        body.extend_from_slice(&version.to_le_bytes());
        body.extend_from_slice(&0x0033u16.to_le_bytes());
        body.extend_from_slice(&48_000_000u32.to_le_bytes());
        body.push(1);
        body.push(streaming_interface);
        self.cs(vc::HEADER, &body);
    }

    /// Camera input terminal.
    pub fn vc_input_terminal(&mut self, id: u8) {
        let [lo, hi] = terminal::CAMERA.to_le_bytes();
        self.cs(
            vc::INPUT_TERMINAL,
            &[id, lo, hi, 0, 0, 0, 0, 0, 0, 0, 0, 3, 0x0a, 0, 0],
        );
    }

    /// Streaming output terminal fed by `source`.
    pub fn vc_output_terminal(&mut self, id: u8, source: u8) {
        let [lo, hi] = terminal::STREAMING.to_le_bytes();
        self.cs(vc::OUTPUT_TERMINAL, &[id, lo, hi, 0, source, 0]);
    }

    pub fn vc_selector_unit(&mut self, id: u8, sources: &[u8]) {
        let mut body = vec![id, sources.len() as u8];
        body.extend_from_slice(sources);
        body.push(0);
        self.cs(vc::SELECTOR_UNIT, &body);
    }

    pub fn vs_input_header(&mut self, num_formats: u8, endpoint: u8) {
        let mut body = vec![num_formats, 0, 0, endpoint, 0, 2, 0, 0, 0, 1];
        body.extend(std::iter::repeat(0).take(num_formats as usize));
        self.cs(vs::INPUT_HEADER, &body);
    }

    pub fn mjpeg_format(&mut self, index: u8, num_frames: u8) {
        self.cs(vs::FORMAT_MJPEG, &[index, num_frames, 1, 1, 0, 0, 0, 0]);
    }

    pub fn mjpeg_frame(&mut self, index: u8, width: u16, height: u16) {
        self.frame(vs::FRAME_MJPEG, index, width, height);
    }

    pub fn uncompressed_format(&mut self, index: u8, num_frames: u8, fourcc: &[u8; 4]) {
        let mut body = vec![index, num_frames];
        body.extend_from_slice(fourcc);
        body.extend_from_slice(&[
            0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xaa, 0x00, 0x38, 0x9b, 0x71,
        ]);
        body.extend_from_slice(&[16, 1, 0, 0, 0, 0]);
        self.cs(vs::FORMAT_UNCOMPRESSED, &body);
    }

    pub fn uncompressed_frame(&mut self, index: u8, width: u16, height: u16) {
        self.frame(vs::FRAME_UNCOMPRESSED, index, width, height);
    }

    fn frame(&mut self, subtype: u8, index: u8, width: u16, height: u16) {
        let size = width as u32 * height as u32 * 2;
        let mut body = vec![index, 0];
        body.extend_from_slice(&width.to_le_bytes());
        body.extend_from_slice(&height.to_le_bytes());
        body.extend_from_slice(&(size * 8).to_le_bytes());
        body.extend_from_slice(&(size * 8 * 30).to_le_bytes());
        body.extend_from_slice(&size.to_le_bytes());
        body.extend_from_slice(&333333u32.to_le_bytes());
        body.push(2);
        body.extend_from_slice(&333333u32.to_le_bytes());
        body.extend_from_slice(&666666u32.to_le_bytes());
        self.cs(subtype, &body);
    }

    /// Prepend the configuration header with the final `wTotalLength`.
    pub fn finish(self, num_interfaces: u8) -> Vec<u8> {
        let total = (9 + self.buf.len()) as u16;
        let [lo, hi] = total.to_le_bytes();
        let mut blob = vec![9, 0x02, lo, hi, num_interfaces, 1, 0, 0x80, 0xfa];
        blob.extend_from_slice(&self.buf);
        blob
    }
}

/// A camera with a control interface, a streaming interface offering MJPEG
/// 640x480 and 128x160 plus YUY2 160x120, and one alternate setting with an
/// isochronous IN endpoint per entry of `packet_sizes`.
pub(crate) fn camera_config(packet_sizes: &[u16]) -> Vec<u8> {
    let mut b = ConfigBuilder::new();
    b.interface(0, 0, subclass::VIDEO_CONTROL, 0);
    b.vc_header(0x0110, 1);
    b.vc_input_terminal(1);
    b.vc_output_terminal(2, 1);

    b.interface(1, 0, subclass::VIDEO_STREAMING, 0);
    b.vs_input_header(2, 0x81);
    b.mjpeg_format(1, 2);
    b.mjpeg_frame(1, 640, 480);
    b.mjpeg_frame(2, 128, 160);
    b.uncompressed_format(2, 1, b"YUY2");
    b.uncompressed_frame(1, 160, 120);

    for (i, &size) in packet_sizes.iter().enumerate() {
        b.interface(1, i as u8 + 1, subclass::VIDEO_STREAMING, 1);
        b.endpoint(0x81, 0x05, size, 1);
    }
    b.finish(2)
}

/// Build a payload with a 12-byte header carrying `flags` followed by `data`.
pub(crate) fn payload(flags: u8, data: &[u8]) -> Vec<u8> {
    let mut packet = vec![12, 0x80 | flags, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
    packet.extend_from_slice(data);
    packet
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ChannelEvent {
    Alloc(u8),
    Open(Channel, ChannelConfig),
    Toggle(Channel, u8),
    Disable(Channel),
    Free(Channel),
}

struct InFlight {
    remaining: u32,
    direction: Direction,
}

/// Host stack that completes control requests after `control_delay`
/// polls and delivers queued isochronous packets in order.
pub(crate) struct SimHost {
    pub now: u32,
    pub channels_available: u8,
    pub control_delay: u32,
    pub fail_control: bool,
    /// Report the control channel idle even with a request in flight.
    pub idle_while_busy: bool,
    pub get_cur_response: [u8; PROBE_COMMIT_LEN],
    pub set_interface_log: Vec<(u8, u8)>,
    pub control_log: Vec<(SetupPacket, Vec<u8>)>,
    pub channel_log: Vec<ChannelEvent>,
    pub isoc_requests: Vec<u16>,
    pub packets: VecDeque<Vec<u8>>,
    next_channel: u8,
    in_flight: Option<InFlight>,
    submitted: bool,
}

impl SimHost {
    pub fn new() -> Self {
        SimHost {
            now: 0,
            channels_available: 4,
            control_delay: 0,
            fail_control: false,
            idle_while_busy: false,
            get_cur_response: [0; PROBE_COMMIT_LEN],
            set_interface_log: Vec::new(),
            control_log: Vec::new(),
            channel_log: Vec::new(),
            isoc_requests: Vec::new(),
            packets: VecDeque::new(),
            next_channel: 1,
            in_flight: None,
            submitted: false,
        }
    }

    pub fn tick(&mut self, ms: u32) {
        self.now = self.now.wrapping_add(ms);
    }

    fn start(&mut self, direction: Direction) {
        self.in_flight = Some(InFlight {
            remaining: self.control_delay,
            direction,
        });
    }
}

impl HostStack for SimHost {
    fn device_address(&self) -> u8 {
        3
    }

    fn device_speed(&self) -> Speed {
        Speed::Full
    }

    fn timer(&self) -> u32 {
        self.now
    }

    fn alloc_channel(&mut self, endpoint: u8) -> Option<Channel> {
        if self.channels_available == 0 {
            return None;
        }
        self.channels_available -= 1;
        self.channel_log.push(ChannelEvent::Alloc(endpoint));
        let channel = Channel(self.next_channel);
        self.next_channel += 1;
        Some(channel)
    }

    fn free_channel(&mut self, channel: Channel) {
        self.channels_available += 1;
        self.channel_log.push(ChannelEvent::Free(channel));
    }

    fn open_channel(&mut self, channel: Channel, config: &ChannelConfig) {
        self.channel_log.push(ChannelEvent::Open(channel, *config));
    }

    fn disable_channel(&mut self, channel: Channel) {
        self.channel_log.push(ChannelEvent::Disable(channel));
    }

    fn set_toggle(&mut self, channel: Channel, toggle: u8) {
        self.channel_log.push(ChannelEvent::Toggle(channel, toggle));
    }

    fn isoc_in(&mut self, _channel: Channel, len: u16) {
        self.isoc_requests.push(len);
        self.submitted = true;
    }

    fn urb_status(&self, _channel: Channel) -> UrbStatus {
        match (self.submitted, self.packets.is_empty()) {
            (false, _) => UrbStatus::Idle,
            (true, true) => UrbStatus::NotReady,
            (true, false) => UrbStatus::Done,
        }
    }

    fn read_isoc_in(&mut self, _channel: Channel, buf: &mut [u8]) -> usize {
        self.submitted = false;
        let Some(packet) = self.packets.pop_front() else {
            return 0;
        };
        let len = packet.len().min(buf.len());
        buf[..len].copy_from_slice(&packet[..len]);
        len
    }

    fn control_idle(&self) -> bool {
        self.idle_while_busy || self.in_flight.is_none()
    }

    fn control_request(&mut self, setup: SetupPacket, data: &[u8]) {
        if setup.control_type == ControlType::Standard
            && setup.request == request::SET_INTERFACE
        {
            self.set_interface_log.push((setup.index as u8, setup.value as u8));
        } else {
            self.control_log.push((setup, data.to_vec()));
        }
        self.start(setup.direction);
    }

    fn control_result(&mut self, data: &mut [u8]) -> Poll<Result<(), TransferError>> {
        let Some(in_flight) = &mut self.in_flight else {
            return Poll::Ready(Ok(()));
        };
        if in_flight.remaining > 0 {
            in_flight.remaining -= 1;
            return Poll::Pending;
        }
        let direction = in_flight.direction;
        self.in_flight = None;

        if self.fail_control {
            return Poll::Ready(Err(TransferError::Stall));
        }
        if direction == Direction::In {
            let len = data.len().min(PROBE_COMMIT_LEN);
            data[..len].copy_from_slice(&self.get_cur_response[..len]);
        }
        Poll::Ready(Ok(()))
    }
}
