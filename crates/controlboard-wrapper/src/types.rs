use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wrapper configuration as read from YAML.
///
/// Either `subdevice` (the wrapper opens and owns one backend) or
/// `networks` + `joints` + `ranges` (backends are attached later with
/// `attach_all`) must be given.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct WrapperConfig {
    /// Port-name prefix, e.g. `/robot/left_arm`.
    pub name: Option<String>,
    /// Publish period in milliseconds.
    pub period: Option<i64>,
    /// Deprecated alias of `period`; rejected when present.
    pub threadrate: Option<i64>,
    /// Backend kind to open and own.
    pub subdevice: Option<String>,
    /// Number of joints exposed by the wrapper.
    pub joints: Option<usize>,
    #[serde(default)]
    pub networks: Vec<String>,
    /// Per-network `(wrapperBase, wrapperTop, deviceBase, deviceTop)`.
    #[serde(default)]
    pub ranges: BTreeMap<String, RangeSpec>,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default = "default_true")]
    pub extended_output: bool,
    pub ros: Option<RosConfig>,
}

fn default_true() -> bool {
    true
}

/// A network range written either as `[0, 5, 0, 5]` or as `"0 5 0 5"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(untagged)]
pub enum RangeSpec {
    List(Vec<i64>),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct RosConfig {
    /// `false`, `true` or `only`.
    pub use_ros: Option<String>,
    pub node_name: Option<String>,
    pub topic_name: Option<String>,
    pub joint_names: Option<Vec<String>>,
}

/// Validated joint mapping of one network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkRange {
    pub wrapper_base: usize,
    pub wrapper_top: usize,
    pub device_base: usize,
    pub device_top: usize,
}

impl NetworkRange {
    pub fn device_axes(&self) -> usize {
        self.device_top - self.device_base + 1
    }
}

/// Which snapshots the periodic task publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Primary snapshots only.
    Disabled,
    /// Primary and ROS-shaped snapshots.
    Enabled,
    /// ROS-shaped snapshots only.
    Only,
    ConfigError,
}

impl OutputMode {
    pub fn publishes_primary(&self) -> bool {
        matches!(self, OutputMode::Disabled | OutputMode::Enabled)
    }

    pub fn publishes_ros(&self) -> bool {
        matches!(self, OutputMode::Enabled | OutputMode::Only)
    }
}
