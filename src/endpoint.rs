//! Finding the isochronous endpoint that carries the video stream.

use heapless::Vec;
use log::{debug, warn};

use crate::{
    class::{subclass, CLASS_VIDEO},
    config::RX_FIFO_SIZE,
    descriptors::{Configuration, InterfaceAltSetting},
    host::Channel,
    transfer::{Direction, EndpointType},
};

/// Number of interface descriptors (counting each alternate setting) that
/// are inspected for stream endpoints.
pub const MAX_STREAM_SCAN: usize = 5;

/// An isochronous IN endpoint offered by one alternate setting of a video
/// streaming interface.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StreamEndpoint {
    #[doc(alias = "bEndpointAddress")]
    pub address: u8,

    /// Raw `wMaxPacketSize`.
    pub max_packet_size: u16,

    pub interface_number: u8,
    pub alternate_setting: u8,

    #[doc(alias = "bInterval")]
    pub interval: u8,
}

impl StreamEndpoint {
    fn from_alt_setting(alt: &InterfaceAltSetting<'_>) -> Option<StreamEndpoint> {
        if alt.class() != CLASS_VIDEO || alt.subclass() != subclass::VIDEO_STREAMING {
            return None;
        }
        let ep = alt.endpoints().next()?;
        if ep.direction() != Direction::In
            || ep.transfer_type() != EndpointType::Isochronous
            || ep.max_packet_size_raw() == 0
        {
            return None;
        }
        Some(StreamEndpoint {
            address: ep.address(),
            max_packet_size: ep.max_packet_size_raw(),
            interface_number: alt.interface_number(),
            alternate_setting: alt.alternate_setting(),
            interval: ep.interval(),
        })
    }
}

/// Stream endpoint candidates of a configuration, in descriptor order.
pub fn stream_candidates(config: &Configuration<'_>) -> Vec<StreamEndpoint, MAX_STREAM_SCAN> {
    let mut candidates = Vec::new();
    for alt in config.interface_alt_settings().take(MAX_STREAM_SCAN) {
        if let Some(ep) = StreamEndpoint::from_alt_setting(&alt) {
            if candidates.push(ep).is_err() {
                warn!("too many stream endpoints, ignoring {:?}", ep);
            }
        }
    }
    candidates
}

/// The candidate with the largest max packet size that fits the receive
/// buffer. The first of equally sized candidates wins.
pub fn best_candidate(candidates: &[StreamEndpoint]) -> Option<StreamEndpoint> {
    let mut best: Option<StreamEndpoint> = None;
    for ep in candidates {
        let fits = (ep.max_packet_size as usize) < RX_FIFO_SIZE;
        let larger = best.map_or(true, |b| ep.max_packet_size > b.max_packet_size);
        if fits && larger {
            best = Some(*ep);
        }
    }
    if let Some(ep) = best {
        debug!(
            "selected iso endpoint 0x{:02X} on interface {} alt {}, size {}",
            ep.address, ep.interface_number, ep.alternate_setting, ep.max_packet_size
        );
    }
    best
}

/// The stream endpoint in use, with its host channel and polling timer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ActiveStreamEndpoint {
    pub endpoint: StreamEndpoint,

    /// Host channel, allocated on attach and released on reset.
    pub channel: Option<Channel>,

    /// Minimum number of ticks between serviced transfers.
    pub poll_interval: u16,

    /// Tick at which the last transfer was serviced.
    pub timer: u32,
}

impl ActiveStreamEndpoint {
    pub fn new(endpoint: StreamEndpoint) -> Self {
        ActiveStreamEndpoint {
            endpoint,
            channel: None,
            poll_interval: endpoint.interval as u16,
            timer: 0,
        }
    }
}
