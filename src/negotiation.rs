//! Polled state machine selecting the streaming interface and negotiating
//! the stream parameters with probe/commit.

use std::task::Poll;

use log::{debug, warn};

use crate::{
    class::{request, vs_control},
    endpoint::StreamEndpoint,
    error::TransferError,
    host::HostStack,
    probe::{ProbeCommit, PROBE_COMMIT_LEN},
    transfer::{Direction, SetupPacket},
};

/// Step of the negotiation with the camera.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RequestState {
    /// Just attached.
    Init,

    /// Selecting the zero-bandwidth alternate setting of the streaming interface.
    SetDefaultInterface,

    /// Unit or terminal control request. Not part of the default sequence
    /// and never completes.
    CsRequest,

    /// Selecting the alternate setting of the stream endpoint.
    SetStreamingInterface,

    /// Reading back the probe the device accepted.
    GetCur,

    /// Proposing format, frame and frame interval with a probe.
    SetCur,

    /// Committing the accepted probe.
    SetCurCommit,

    /// Negotiation finished, streaming may run.
    Idle,
}

impl RequestState {
    /// Whether this step waits for its control transfer inside a single
    /// poll. Other steps start a transfer and return, then pick up its
    /// result on a later poll.
    pub fn is_synchronous(self) -> bool {
        matches!(
            self,
            RequestState::GetCur | RequestState::SetCur | RequestState::SetCurCommit
        )
    }
}

/// Busy-wait for the control transfer in flight.
fn wait_control<H: HostStack>(host: &mut H, data: &mut [u8]) -> Result<(), TransferError> {
    loop {
        if let Poll::Ready(result) = host.control_result(data) {
            return result;
        }
        std::hint::spin_loop();
    }
}

/// Negotiation progress and the stream parameters exchanged so far.
#[derive(Debug, Clone)]
pub struct Negotiation {
    state: RequestState,
    stream: Option<StreamEndpoint>,
    format_index: u8,
    frame_index: u8,
    frame_interval: u32,
    params: ProbeCommit,

    /// A `SET_INTERFACE` was started and its result not yet collected.
    interface_pending: bool,
}

impl Negotiation {
    /// Start negotiating `format_index`/`frame_index` at `frame_interval` on
    /// the interface of `stream`.
    ///
    /// Without a stream endpoint the state machine never leaves
    /// [`RequestState::SetDefaultInterface`].
    pub fn new(
        stream: Option<StreamEndpoint>,
        format_index: u8,
        frame_index: u8,
        frame_interval: u32,
    ) -> Self {
        Negotiation {
            state: RequestState::Init,
            stream,
            format_index,
            frame_index,
            frame_interval,
            params: ProbeCommit::default(),
            interface_pending: false,
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    /// The stream parameters as last sent or received.
    pub fn params(&self) -> &ProbeCommit {
        &self.params
    }

    fn advance(&mut self, next: RequestState) {
        debug!("request state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Advance by at most one control transfer.
    ///
    /// Returns `Poll::Ready` once negotiation is complete. The poll that
    /// reaches [`RequestState::Idle`] still returns `Poll::Pending`.
    pub fn poll<H: HostStack>(&mut self, host: &mut H) -> Poll<()> {
        match self.state {
            RequestState::Init | RequestState::SetDefaultInterface => {
                match self.stream {
                    Some(stream) => {
                        if self.poll_set_interface(host, stream.interface_number, 0) {
                            self.advance(RequestState::SetCur);
                        }
                    }
                    None => self.state = RequestState::SetDefaultInterface,
                }
            }
            RequestState::CsRequest => {
                if self.poll_cs_request(host).is_ready() {
                    self.advance(RequestState::SetStreamingInterface);
                }
            }
            RequestState::SetStreamingInterface => {
                if let Some(stream) = self.stream {
                    let alt = stream.alternate_setting;
                    if self.poll_set_interface(host, stream.interface_number, alt) {
                        self.advance(RequestState::Idle);
                    }
                }
            }
            RequestState::GetCur => {
                if self.get_cur(host, vs_control::PROBE).is_ok() {
                    self.advance(RequestState::SetCurCommit);
                }
            }
            RequestState::SetCur => {
                self.params =
                    ProbeCommit::probe(self.format_index, self.frame_index, self.frame_interval);
                self.set_cur(host, vs_control::PROBE);
                self.advance(RequestState::GetCur);
            }
            RequestState::SetCurCommit => {
                self.set_cur(host, vs_control::COMMIT);
                self.advance(RequestState::SetStreamingInterface);
            }
            RequestState::Idle => return Poll::Ready(()),
        }
        Poll::Pending
    }

    /// Start `SET_INTERFACE` once the control channel is free, then check it
    /// on later polls. Returns `true` once it completed. A failed request is
    /// started again.
    fn poll_set_interface<H: HostStack>(&mut self, host: &mut H, interface: u8, alt: u8) -> bool {
        if !self.interface_pending {
            if host.control_idle() {
                host.set_interface(interface, alt);
                self.interface_pending = true;
            }
            return false;
        }
        match host.control_result(&mut []) {
            Poll::Pending => false,
            Poll::Ready(Ok(())) => {
                self.interface_pending = false;
                true
            }
            Poll::Ready(Err(e)) => {
                warn!("SET_INTERFACE {interface} alt {alt} failed: {e}");
                self.interface_pending = false;
                false
            }
        }
    }

    /// Unit and terminal controls aren't supported.
    fn poll_cs_request<H: HostStack>(&mut self, _host: &mut H) -> Poll<()> {
        Poll::Pending
    }

    fn interface_number(&self) -> u8 {
        self.stream.map_or(0, |s| s.interface_number)
    }

    fn get_cur<H: HostStack>(&mut self, host: &mut H, control: u8) -> Result<(), TransferError> {
        let setup = SetupPacket::class_interface(
            Direction::In,
            request::GET_CUR,
            (control as u16) << 8,
            self.interface_number(),
            PROBE_COMMIT_LEN as u16,
        );
        host.control_request(setup, &[]);

        let mut data = [0; PROBE_COMMIT_LEN];
        match wait_control(host, &mut data) {
            Ok(()) => {
                self.params = ProbeCommit::from_bytes(&data);
                debug!("device accepted {:?}", self.params);
                Ok(())
            }
            Err(e) => {
                warn!("GET_CUR {control} failed: {e}");
                Err(e)
            }
        }
    }

    /// The result is only logged: negotiation moves on either way.
    fn set_cur<H: HostStack>(&self, host: &mut H, control: u8) {
        let setup = SetupPacket::class_interface(
            Direction::Out,
            request::SET_CUR,
            (control as u16) << 8,
            self.interface_number(),
            PROBE_COMMIT_LEN as u16,
        );
        host.control_request(setup, &self.params.to_bytes());

        if let Err(e) = wait_control(host, &mut []) {
            warn!("SET_CUR {control} failed: {e}");
        }
    }
}
