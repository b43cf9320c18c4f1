//! Interface to the USB host stack that owns the controller.
//!
//! The class driver never touches hardware. Enumeration, channel
//! management and the actual transfers are done by the platform's host stack
//! through [`HostStack`], and the driver is polled from the same
//! non-reentrant loop that drives that stack.

use std::task::Poll;

use crate::{
    error::TransferError,
    transfer::{EndpointType, SetupPacket, Speed, UrbStatus},
};

/// Host controller channel handle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Channel(pub u8);

/// Parameters for opening a host channel on a device endpoint.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    #[doc(alias = "bEndpointAddress")]
    pub endpoint: u8,
    pub device_address: u8,
    pub endpoint_type: EndpointType,
    pub max_packet_size: u16,
    pub speed: Speed,
}

/// Operations the class driver needs from the host stack.
///
/// Control requests follow the host stack's completion model: a request is
/// started with [`control_request`][Self::control_request] while
/// [`control_idle`][Self::control_idle] is true, and its outcome is picked up
/// with [`control_result`][Self::control_result], which returns
/// `Poll::Pending` until the transfer finished. The driver calls
/// `control_result` after every request it starts, whatever `control_idle`
/// reports in between.
pub trait HostStack {
    /// Address assigned to the device during enumeration.
    fn device_address(&self) -> u8;

    /// Bus speed of the device.
    fn device_speed(&self) -> Speed;

    /// Millisecond tick of the host loop.
    fn timer(&self) -> u32;

    /// Allocate a host channel for `endpoint`, or `None` if all are in use.
    fn alloc_channel(&mut self, endpoint: u8) -> Option<Channel>;

    fn free_channel(&mut self, channel: Channel);

    fn open_channel(&mut self, channel: Channel, config: &ChannelConfig);

    fn disable_channel(&mut self, channel: Channel);

    /// Reset the data toggle (DATA0/DATA1) of a channel.
    fn set_toggle(&mut self, channel: Channel, toggle: u8);

    /// Start an isochronous IN transfer of up to `len` bytes.
    fn isoc_in(&mut self, channel: Channel, len: u16);

    /// State of the last transfer started on `channel`.
    fn urb_status(&self, channel: Channel) -> UrbStatus;

    /// Copy the data of the completed IN transfer on `channel` into `buf`,
    /// returning the number of bytes actually received.
    fn read_isoc_in(&mut self, channel: Channel, buf: &mut [u8]) -> usize;

    /// Whether the control channel can accept a new request.
    fn control_idle(&self) -> bool;

    /// Start a standard `SET_INTERFACE` request.
    fn set_interface(&mut self, interface: u8, alt_setting: u8) {
        self.control_request(SetupPacket::set_interface(interface, alt_setting), &[]);
    }

    /// Start a control request. For OUT requests `data` is the data stage;
    /// for IN requests it is empty and `setup.length` bytes are requested.
    fn control_request(&mut self, setup: SetupPacket, data: &[u8]);

    /// Check completion of the current control request. On completion of an
    /// IN request the received data stage is copied into `data`.
    fn control_result(&mut self, data: &mut [u8]) -> Poll<Result<(), TransferError>>;
}
