//! Transfer-related types shared with the host stack.

mod control;
pub use control::{request, ControlType, Recipient, SetupPacket, SETUP_PACKET_SIZE};

/// Transfer direction, as seen from the host.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Direction {
    /// Host to device
    Out = 0,

    /// Device to host
    In = 1,
}

/// Endpoint type.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EndpointType {
    /// Control endpoint.
    Control = 0,

    /// Isochronous endpoint.
    Isochronous = 1,

    /// Bulk endpoint.
    Bulk = 2,

    /// Interrupt endpoint.
    Interrupt = 3,
}

/// Bus speed of the attached device.
#[derive(Copy, Clone, Eq, PartialOrd, Ord, PartialEq, Hash, Debug)]
pub enum Speed {
    /// Low speed (1.5 Mbit)
    Low,

    /// Full speed (12 Mbit)
    Full,

    /// High speed (480 Mbit)
    High,
}

/// State of the last request block submitted on a host channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UrbStatus {
    /// Nothing has been submitted since the channel was opened.
    Idle,

    /// Transfer completed and data is available.
    Done,

    /// Transfer still in flight.
    NotReady,

    /// Endpoint in a STALL condition.
    Stall,

    /// Hardware issue or protocol violation.
    Error,
}
