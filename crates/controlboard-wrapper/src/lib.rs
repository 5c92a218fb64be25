//! controlboard-wrapper: one logical multi-axis control board over several
//! motor-control backends
//!
//! A [`ControlBoardWrapper`] maps a contiguous range of logical joints onto
//! slices of attached backends, routes every control and sensing call to the
//! backend that owns each joint, publishes joint-state snapshots on a fixed
//! period and serves the RPC ([`RpcParser`]) and streaming
//! ([`StreamingParser`]) command surfaces.

mod types;
pub use types::{NetworkRange, OutputMode, RangeSpec, RosConfig, WrapperConfig};

mod loader;
pub use loader::{load_config_file, Layout, RosSettings, Settings, DEFAULT_PERIOD_MS};

mod error;
pub use error::{Result, WrapperError};

mod wire;
pub use wire::{Bottle, ParseError, Value, Vocab};

pub mod vocab;

mod subdevice;
pub use subdevice::SubDevice;

mod wrapped;
pub use wrapped::{LutEntry, WrappedDevice};

mod remap;

mod metrics;
pub use metrics::WrapperMetrics;

mod publish;
pub use publish::{Field, JointState, LatestSnapshots, RosJointState, Stamp, StatePublisher};

mod wrapper;
pub use wrapper::{ControlBoardWrapper, DriverFactory, DriverHandle};

mod rpc;
pub use rpc::{
    RpcParser, RpcReply, PROTOCOL_VERSION_MAJOR, PROTOCOL_VERSION_MINOR, PROTOCOL_VERSION_TWEAK,
};

mod streaming;
pub use streaming::{CommandMessage, StreamingParser};
