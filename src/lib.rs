//! USB Video Class driver for embedded USB hosts.
//!
//! The driver sits on top of a host stack that enumerates the camera and
//! performs transfers, accessed through the [`HostStack`] trait. After
//! enumeration, [`UvcDevice::attach`] parses the configuration descriptor,
//! picks the isochronous stream endpoint and the requested format and frame
//! size, and opens the stream channel. From then on the host's main loop
//! calls [`UvcDevice::poll_request`] to negotiate the stream with
//! probe/commit and [`UvcDevice::poll_process`] to receive video payloads,
//! which are reassembled into two caller-provided frame buffers.
//!
//! Nothing allocates: descriptor tables have fixed capacities and reference
//! the descriptor blob, and frames are written into borrowed buffers.
//!
//! ```ignore
//! let mut dev = UvcDevice::attach(&mut host, config_descriptor, UvcConfig::default())?;
//! dev.stream_init(&mut buf0, &mut buf1);
//! loop {
//!     let _ = dev.poll_request(&mut host);
//!     dev.poll_process(&mut host);
//!     if dev.frames().new_frame() {
//!         display(dev.frames().filled_frame());
//!         dev.frames_mut().rearm();
//!     }
//! }
//! ```

pub mod class;

pub mod descriptors;
pub use descriptors::{Configuration, Descriptor, Descriptors, Endpoint, InterfaceAltSetting};

pub mod class_descriptors;
pub use class_descriptors::ClassDescriptors;

pub mod transfer;

mod host;
pub use host::{Channel, ChannelConfig, HostStack};

mod config;
pub use config::{UvcConfig, VideoFormat, DEFAULT_FRAME_INTERVAL, RX_FIFO_SIZE};

mod select;
pub use select::{select_format, select_frame, Selection};

mod endpoint;
pub use endpoint::{
    best_candidate, stream_candidates, ActiveStreamEndpoint, StreamEndpoint, MAX_STREAM_SCAN,
};

mod probe;
pub use probe::{ProbeCommit, HINT_FRAME_INTERVAL, PROBE_COMMIT_LEN};

mod negotiation;
pub use negotiation::{Negotiation, RequestState};

mod stream;
pub use stream::{ReceiveLoop, StreamState};

mod reassembly;
pub use reassembly::{Reassembler, StreamStats, PAYLOAD_HEADER_SIZE};

mod device;
pub use device::UvcDevice;

mod error;
pub use error::{Error, ErrorKind, TransferError};

#[cfg(test)]
mod testutil;
