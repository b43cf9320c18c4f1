//! Polled isochronous receive loop feeding the reassembler.

use log::debug;

use crate::{
    config::RX_FIFO_SIZE,
    endpoint::ActiveStreamEndpoint,
    host::HostStack,
    reassembly::Reassembler,
    transfer::UrbStatus,
};

/// State of the isochronous IN pipe.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StreamState {
    /// Waiting for negotiation to finish.
    Idle,

    /// First transfer is about to be submitted.
    StartIn,

    /// A transfer is in flight and gets resubmitted whenever it completes.
    DataIn,
}

/// Keeps exactly one isochronous IN transfer in flight on the stream
/// endpoint, handing every completed one to the reassembler.
pub struct ReceiveLoop {
    state: StreamState,
    scratch: [u8; RX_FIFO_SIZE],
}

impl ReceiveLoop {
    pub fn new() -> Self {
        ReceiveLoop {
            state: StreamState::Idle,
            scratch: [0; RX_FIFO_SIZE],
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Begin streaming on the next poll.
    pub fn start(&mut self) {
        debug!("starting isochronous stream");
        self.state = StreamState::StartIn;
    }

    /// Service the stream endpoint once. Does nothing while the endpoint has
    /// no channel.
    pub fn poll<H: HostStack>(
        &mut self,
        host: &mut H,
        endpoint: &mut ActiveStreamEndpoint,
        reassembler: &mut Reassembler<'_>,
    ) {
        let Some(channel) = endpoint.channel else {
            return;
        };
        let max_packet_size = endpoint.endpoint.max_packet_size;

        match self.state {
            StreamState::Idle => {}
            StreamState::StartIn => {
                host.isoc_in(channel, max_packet_size);
                self.state = StreamState::DataIn;
                endpoint.timer = host.timer();
            }
            StreamState::DataIn => {
                let now = host.timer();
                let elapsed = now.wrapping_sub(endpoint.timer);
                if host.urb_status(channel) == UrbStatus::Done
                    && elapsed >= endpoint.poll_interval as u32
                {
                    endpoint.timer = now;
                    let len = host.read_isoc_in(channel, &mut self.scratch);
                    reassembler.process_packet(&self.scratch[..len.min(RX_FIFO_SIZE)]);
                    host.isoc_in(channel, max_packet_size);
                }
            }
        }
    }
}

impl Default for ReceiveLoop {
    fn default() -> Self {
        ReceiveLoop::new()
    }
}

impl std::fmt::Debug for ReceiveLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiveLoop")
            .field("state", &self.state)
            .finish()
    }
}
