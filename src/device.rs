//! An attached camera and the per-device state driving it.

use std::task::Poll;

use heapless::Vec;

use crate::{
    class_descriptors::ClassDescriptors,
    config::UvcConfig,
    descriptors::Configuration,
    endpoint::{
        best_candidate, stream_candidates, ActiveStreamEndpoint, StreamEndpoint, MAX_STREAM_SCAN,
    },
    error::{Error, ErrorKind},
    host::{ChannelConfig, HostStack},
    negotiation::{Negotiation, RequestState},
    probe::ProbeCommit,
    reassembly::Reassembler,
    select::Selection,
    stream::{ReceiveLoop, StreamState},
    transfer::EndpointType,
};

/// An attached camera.
///
/// Borrows the configuration descriptor blob for `'cfg` and the frame
/// buffers bound with [`stream_init`][Self::stream_init] for `'buf`. Drive it
/// by calling [`poll_request`][Self::poll_request] and
/// [`poll_process`][Self::poll_process] from the host stack's main loop, and
/// read frames through [`frames`][Self::frames].
pub struct UvcDevice<'cfg, 'buf> {
    config: UvcConfig,
    descriptors: ClassDescriptors<'cfg>,
    selection: Selection,
    candidates: Vec<StreamEndpoint, MAX_STREAM_SCAN>,
    stream_endpoint: ActiveStreamEndpoint,
    negotiation: Negotiation,
    receive: ReceiveLoop,
    reassembler: Reassembler<'buf>,
}

impl<'cfg, 'buf> UvcDevice<'cfg, 'buf> {
    /// Set up the video class on a freshly enumerated device.
    ///
    /// `config_descriptor` is the full configuration descriptor read during
    /// enumeration. Picks the stream endpoint, parses the class-specific
    /// descriptors, resolves the format and frame requested by `config` and
    /// opens an isochronous channel on the stream endpoint.
    ///
    /// ### Errors
    /// * [`ErrorKind::NotSupported`] if no video streaming interface offers an
    ///   isochronous IN endpoint that fits the receive buffer.
    /// * [`ErrorKind::Fail`] if the descriptor blob is malformed, the format
    ///   or frame size isn't offered, or no host channel is free.
    pub fn attach<H: HostStack>(
        host: &mut H,
        config_descriptor: &'cfg [u8],
        config: UvcConfig,
    ) -> Result<UvcDevice<'cfg, 'buf>, Error> {
        let configuration = Configuration::new(config_descriptor).ok_or_else(|| {
            Error::new(ErrorKind::Fail, "invalid configuration descriptor").log_error()
        })?;

        let candidates = stream_candidates(&configuration);
        let endpoint = best_candidate(&candidates).ok_or_else(|| {
            Error::new(ErrorKind::NotSupported, "no usable video stream endpoint").log_error()
        })?;

        let descriptors = ClassDescriptors::parse(&configuration);
        let selection = Selection::select(&descriptors, &config);
        let format_index = selection
            .format_index
            .ok_or_else(|| Error::new(ErrorKind::Fail, "video format not offered").log_debug())?;
        let frame_index = selection
            .frame_index
            .ok_or_else(|| Error::new(ErrorKind::Fail, "frame size not offered").log_debug())?;

        let mut stream_endpoint = ActiveStreamEndpoint::new(endpoint);
        let channel = host
            .alloc_channel(endpoint.address)
            .ok_or_else(|| Error::new(ErrorKind::Fail, "no free host channel").log_error())?;
        let channel_config = ChannelConfig {
            endpoint: endpoint.address,
            device_address: host.device_address(),
            endpoint_type: EndpointType::Isochronous,
            max_packet_size: endpoint.max_packet_size,
            speed: host.device_speed(),
        };
        host.open_channel(channel, &channel_config);
        host.set_toggle(channel, 0);
        stream_endpoint.channel = Some(channel);

        Ok(UvcDevice {
            config,
            descriptors,
            selection,
            candidates,
            stream_endpoint,
            negotiation: Negotiation::new(
                Some(endpoint),
                format_index,
                frame_index,
                config.frame_interval,
            ),
            receive: ReceiveLoop::new(),
            reassembler: Reassembler::new(config.format, config.frame_size),
        })
    }

    /// Release the stream channel after the device was detached or reset.
    ///
    /// The receive loop stops servicing the endpoint. Buffers can be rebound
    /// with [`stream_init`][Self::stream_init].
    pub fn reset<H: HostStack>(&mut self, host: &mut H) {
        if let Some(channel) = self.stream_endpoint.channel.take() {
            host.free_channel(channel);
            host.disable_channel(channel);
        }
    }

    /// Advance interface selection and probe/commit negotiation.
    ///
    /// Returns `Poll::Ready` once negotiation is done. Completing it starts
    /// the receive loop.
    pub fn poll_request<H: HostStack>(&mut self, host: &mut H) -> Poll<()> {
        let before = self.negotiation.state();
        let poll = self.negotiation.poll(host);
        if before == RequestState::SetStreamingInterface
            && self.negotiation.state() == RequestState::Idle
        {
            self.receive.start();
        }
        poll
    }

    /// Service the isochronous stream endpoint.
    pub fn poll_process<H: HostStack>(&mut self, host: &mut H) {
        self.receive.poll(host, &mut self.stream_endpoint, &mut self.reassembler);
    }

    /// Bind the two frame buffers the reassembler alternates between.
    pub fn stream_init(&mut self, buf0: &'buf mut [u8], buf1: &'buf mut [u8]) {
        self.reassembler.init(buf0, buf1);
    }

    /// Completed frames.
    pub fn frames(&self) -> &Reassembler<'buf> {
        &self.reassembler
    }

    /// Completed frames, for in-place processing and to
    /// [`rearm`][Reassembler::rearm] after reading one.
    pub fn frames_mut(&mut self) -> &mut Reassembler<'buf> {
        &mut self.reassembler
    }

    pub fn config(&self) -> &UvcConfig {
        &self.config
    }

    /// Class-specific descriptors of the camera.
    pub fn descriptors(&self) -> &ClassDescriptors<'cfg> {
        &self.descriptors
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Every stream endpoint found, in descriptor order.
    pub fn stream_candidates(&self) -> &[StreamEndpoint] {
        &self.candidates
    }

    pub fn stream_endpoint(&self) -> &ActiveStreamEndpoint {
        &self.stream_endpoint
    }

    /// Stream parameters from the last probe/commit exchange.
    pub fn negotiated(&self) -> &ProbeCommit {
        self.negotiation.params()
    }

    pub fn request_state(&self) -> RequestState {
        self.negotiation.state()
    }

    pub fn stream_state(&self) -> StreamState {
        self.receive.state()
    }
}

impl std::fmt::Debug for UvcDevice<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UvcDevice")
            .field("config", &self.config)
            .field("selection", &self.selection)
            .field("stream_endpoint", &self.stream_endpoint)
            .field("negotiation", &self.negotiation)
            .field("receive", &self.receive)
            .field("reassembler", &self.reassembler)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::VideoFormat,
        host::Channel,
        testutil::{self, init_logger, payload, ChannelEvent, SimHost},
        transfer::Speed,
    };

    #[test]
    fn test_attach() {
        init_logger();
        let blob = testutil::camera_config(&[64, 512, 1023]);
        let mut host = SimHost::new();
        let dev = UvcDevice::attach(&mut host, &blob, UvcConfig::default()).unwrap();

        assert_eq!(dev.stream_candidates().len(), 3);
        assert_eq!(dev.stream_endpoint().endpoint.max_packet_size, 512);
        assert_eq!(dev.stream_endpoint().channel, Some(Channel(1)));
        assert_eq!(dev.selection().indices(), Some((1, 2)));
        assert_eq!(dev.descriptors().mjpeg_frames().len(), 2);
        assert_eq!(dev.request_state(), RequestState::Init);
        assert_eq!(dev.stream_state(), StreamState::Idle);

        assert_eq!(
            host.channel_log,
            vec![
                ChannelEvent::Alloc(0x81),
                ChannelEvent::Open(
                    Channel(1),
                    ChannelConfig {
                        endpoint: 0x81,
                        device_address: 3,
                        endpoint_type: EndpointType::Isochronous,
                        max_packet_size: 512,
                        speed: Speed::Full,
                    }
                ),
                ChannelEvent::Toggle(Channel(1), 0),
            ]
        );
    }

    #[test]
    fn test_attach_errors() {
        let mut host = SimHost::new();

        let err = UvcDevice::attach(&mut host, &[9, 2, 9], UvcConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fail);

        let blob = testutil::camera_config(&[]);
        let err = UvcDevice::attach(&mut host, &blob, UvcConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupported);

        let blob = testutil::camera_config(&[1023]);
        let err = UvcDevice::attach(&mut host, &blob, UvcConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupported);

        let blob = testutil::camera_config(&[512]);
        let config = UvcConfig::new(VideoFormat::Mjpeg, 1920, 1080);
        let err = UvcDevice::attach(&mut host, &blob, config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fail);
        assert_eq!(err.to_string(), "frame size not offered");

        host.channels_available = 0;
        let err = UvcDevice::attach(&mut host, &blob, UvcConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fail);
        assert!(host.channel_log.is_empty());
    }

    #[test]
    fn test_stream_frames() {
        init_logger();
        let blob = testutil::camera_config(&[128, 512]);
        let mut host = SimHost::new();
        let mut buf0 = [0u8; 128 * 160];
        let mut buf1 = [0u8; 128 * 160];

        host.get_cur_response = ProbeCommit {
            format_index: 1,
            frame_index: 2,
            frame_interval: 333333,
            max_payload_transfer_size: 512,
            ..Default::default()
        }
        .to_bytes();

        let mut dev = UvcDevice::attach(&mut host, &blob, UvcConfig::default()).unwrap();
        dev.stream_init(&mut buf0, &mut buf1);

        // streaming waits for negotiation
        dev.poll_process(&mut host);
        assert!(host.isoc_requests.is_empty());

        let mut polls = 0;
        while dev.poll_request(&mut host).is_pending() {
            polls += 1;
            assert!(polls < 20);
        }
        assert_eq!(polls, 7);
        assert_eq!(dev.stream_state(), StreamState::StartIn);
        assert_eq!(host.set_interface_log, vec![(1, 0), (1, 2)]);
        assert_eq!(dev.negotiated().frame_index, 2);
        assert_eq!(dev.negotiated().max_payload_transfer_size, 512);

        dev.poll_process(&mut host);
        assert_eq!(dev.stream_state(), StreamState::DataIn);

        host.packets.push_back(payload(1, &[0xff, 0xd8]));
        host.packets.push_back(payload(1, &[0x00, 0x11]));
        host.packets.push_back(payload(1 | 2, &[0xff, 0xd9]));
        for _ in 0..3 {
            host.tick(1);
            dev.poll_process(&mut host);
        }

        assert!(dev.frames().new_frame());
        assert_eq!(dev.frames().filled_frame(), &[0xff, 0xd8, 0x00, 0x11, 0xff, 0xd9]);
        assert_eq!(dev.frames().stats().data_packets, 3);
        dev.frames_mut().rearm();
        assert!(!dev.frames().new_frame());

        dev.reset(&mut host);
        assert_eq!(dev.stream_endpoint().channel, None);
        assert_eq!(
            &host.channel_log[3..],
            &[ChannelEvent::Free(Channel(1)), ChannelEvent::Disable(Channel(1))]
        );

        // nothing is submitted once the channel is gone
        let submitted = host.isoc_requests.len();
        host.packets.push_back(payload(0, &[1]));
        host.tick(1);
        dev.poll_process(&mut host);
        assert_eq!(host.isoc_requests.len(), submitted);

        dev.reset(&mut host);
        assert_eq!(host.channel_log.len(), 5);
    }

    #[test]
    fn test_yuy2_stream() {
        let blob = testutil::camera_config(&[512]);
        let mut host = SimHost::new();
        let mut buf0 = [0u8; 8];
        let mut buf1 = [0u8; 8];
        let config = UvcConfig::new(VideoFormat::Yuy2, 160, 120).with_frame_size(8);

        let mut dev = UvcDevice::attach(&mut host, &blob, config).unwrap();
        assert_eq!(dev.selection().indices(), Some((2, 1)));
        dev.stream_init(&mut buf0, &mut buf1);

        while dev.poll_request(&mut host).is_pending() {}
        dev.poll_process(&mut host);

        host.packets.push_back(payload(1, &[1, 2, 3, 4, 5]));
        host.packets.push_back(payload(1, &[6, 7, 8]));
        for _ in 0..2 {
            host.tick(1);
            dev.poll_process(&mut host);
        }
        assert_eq!(dev.frames().filled_frame(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
