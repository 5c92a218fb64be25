use crate::types::{NetworkRange, OutputMode, RangeSpec, RosConfig, WrapperConfig};
use crate::{Result, WrapperError};
use anyhow::Context;
use serde_yaml::Value;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, warn};

/// Publish period used when `period` is not configured.
pub const DEFAULT_PERIOD_MS: u64 = 20;

pub fn load_config_file(path: impl AsRef<Path>) -> anyhow::Result<WrapperConfig> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading wrapper config: {}", path.display()))?;
    let val: Value =
        serde_yaml::from_str(&raw).with_context(|| format!("parsing yaml: {}", path.display()))?;
    let cfg: WrapperConfig = serde_yaml::from_value(val)
        .with_context(|| format!("decoding wrapper config: {}", path.display()))?;
    Ok(cfg)
}

/// How backends are bound to the wrapper.
#[derive(Debug, Clone, PartialEq)]
pub enum Layout {
    /// The wrapper opens one backend of this kind and owns it.
    Owned { kind: String },
    /// Backends are attached later, one per network.
    Deferred {
        joints: usize,
        networks: Vec<(String, NetworkRange)>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RosSettings {
    pub node_name: String,
    pub topic_name: String,
    /// Fallback names when the backends do not report axis names.
    pub joint_names: Option<Vec<String>>,
}

/// A configuration that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub part_name: String,
    pub period: Duration,
    pub verbose: bool,
    pub extended_output: bool,
    pub output_mode: OutputMode,
    pub ros: Option<RosSettings>,
    pub layout: Layout,
}

impl WrapperConfig {
    pub fn validate(&self) -> Result<Settings> {
        let part_name = self.part_name()?;
        let period = self.period()?;
        let layout = self.layout()?;
        let (output_mode, ros) = self.ros_settings(&part_name);
        if output_mode == OutputMode::ConfigError {
            return Err(WrapperError::config("invalid ROS parameter group"));
        }
        if let (Layout::Deferred { joints, .. }, Some(ros)) = (&layout, &ros) {
            check_joint_names(ros, *joints)?;
        }
        Ok(Settings {
            part_name,
            period,
            verbose: self.verbose,
            extended_output: self.extended_output,
            output_mode,
            ros,
            layout,
        })
    }

    /// The port-name prefix, with a leading `/` enforced.
    pub fn part_name(&self) -> Result<String> {
        let name = self
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| WrapperError::config("missing mandatory parameter 'name'"))?;
        if name.starts_with('/') {
            Ok(name.to_string())
        } else {
            warn!(name, "'name' must start with '/', prefixing it");
            Ok(format!("/{name}"))
        }
    }

    pub fn period(&self) -> Result<Duration> {
        if self.threadrate.is_some() {
            return Err(WrapperError::config(
                "'threadrate' is deprecated, use 'period' (milliseconds) instead",
            ));
        }
        match self.period {
            None => {
                info!("'period' not given, using {DEFAULT_PERIOD_MS} ms");
                Ok(Duration::from_millis(DEFAULT_PERIOD_MS))
            }
            Some(ms) if ms > 0 => Ok(Duration::from_millis(ms.unsigned_abs())),
            Some(ms) => Err(WrapperError::config(format!(
                "'period' must be a positive number of milliseconds, got {ms}"
            ))),
        }
    }

    pub fn layout(&self) -> Result<Layout> {
        match (&self.subdevice, self.networks.is_empty()) {
            (Some(_), false) => Err(WrapperError::config(
                "'subdevice' and 'networks' are mutually exclusive",
            )),
            (Some(kind), true) => Ok(Layout::Owned { kind: kind.clone() }),
            (None, true) => Err(WrapperError::config(
                "either 'subdevice' or 'networks' must be given",
            )),
            (None, false) => {
                let joints = self
                    .joints
                    .ok_or_else(|| WrapperError::config("'networks' requires 'joints'"))?;
                let mut networks = Vec::with_capacity(self.networks.len());
                for net in &self.networks {
                    let spec = self.ranges.get(net).ok_or_else(|| {
                        WrapperError::config(format!("missing range for network '{net}'"))
                    })?;
                    networks.push((net.clone(), spec.parse(net)?));
                }
                Ok(Layout::Deferred { joints, networks })
            }
        }
    }

    /// Reads the optional `ros` group. Errors are logged and reported as
    /// [`OutputMode::ConfigError`].
    pub fn ros_settings(&self, part: &str) -> (OutputMode, Option<RosSettings>) {
        let Some(group) = &self.ros else {
            return (OutputMode::Disabled, None);
        };
        let mode = match group.use_ros.as_deref() {
            Some("false") => return (OutputMode::Disabled, None),
            Some("true") => OutputMode::Enabled,
            Some("only") => OutputMode::Only,
            Some(other) => {
                error!(part, value = other, "unsupported use_ros value, expected true, false or only");
                return (OutputMode::ConfigError, None);
            }
            None => {
                error!(part, "ros group without use_ros");
                return (OutputMode::ConfigError, None);
            }
        };
        match ros_names(group) {
            Some((node_name, topic_name)) => {
                info!(part, node = %node_name, topic = %topic_name, "ROS output enabled");
                (
                    mode,
                    Some(RosSettings {
                        node_name,
                        topic_name,
                        joint_names: group.joint_names.clone(),
                    }),
                )
            }
            None => {
                error!(part, "node_name and topic_name are mandatory when use_ros is set");
                (OutputMode::ConfigError, None)
            }
        }
    }
}

fn ros_names(group: &RosConfig) -> Option<(String, String)> {
    let node = group.node_name.clone().filter(|n| !n.is_empty())?;
    let topic = group.topic_name.clone().filter(|n| !n.is_empty())?;
    Some((node, topic))
}

pub(crate) fn check_joint_names(ros: &RosSettings, joints: usize) -> Result<()> {
    match &ros.joint_names {
        Some(names) if names.len() != joints => Err(WrapperError::config(format!(
            "ros joint_names has {} entries, expected {joints}",
            names.len()
        ))),
        _ => Ok(()),
    }
}

impl RangeSpec {
    pub fn parse(&self, network: &str) -> Result<NetworkRange> {
        let values: Vec<i64> = match self {
            RangeSpec::List(v) => v.clone(),
            RangeSpec::Text(s) => s
                .split_whitespace()
                .map(|t| t.parse::<i64>())
                .collect::<core::result::Result<_, _>>()
                .map_err(|e| {
                    WrapperError::config(format!("range of '{network}' is not numeric: {e}"))
                })?,
        };
        let bad = || {
            WrapperError::config(format!(
                "range of '{network}' must be four non-negative integers, got {values:?}"
            ))
        };
        if values.len() != 4 {
            return Err(bad());
        }
        let mut idx = [0usize; 4];
        for (slot, v) in idx.iter_mut().zip(&values) {
            *slot = usize::try_from(*v).map_err(|_| bad())?;
        }
        Ok(NetworkRange {
            wrapper_base: idx[0],
            wrapper_top: idx[1],
            device_base: idx[2],
            device_top: idx[3],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_part() -> WrapperConfig {
        serde_yaml::from_str(
            r#"
name: /robot/lower
joints: 9
networks: [legs, torso]
ranges:
  legs: [0, 5, 0, 5]
  torso: "6 8 0 2"
"#,
        )
        .unwrap()
    }

    #[test]
    fn period_defaults_to_twenty_ms() {
        let cfg = two_part();
        assert_eq!(cfg.period().unwrap(), Duration::from_millis(20));
    }

    #[test]
    fn zero_period_is_rejected() {
        let mut cfg = two_part();
        cfg.period = Some(0);
        assert!(matches!(cfg.validate(), Err(WrapperError::Configuration(_))));
    }

    #[test]
    fn threadrate_is_rejected() {
        let mut cfg = two_part();
        cfg.threadrate = Some(10);
        assert!(cfg.period().is_err());
    }

    #[test]
    fn string_and_list_ranges_parse_alike() {
        let cfg = two_part();
        let Layout::Deferred { joints, networks } = cfg.layout().unwrap() else {
            panic!("expected deferred layout");
        };
        assert_eq!(joints, 9);
        assert_eq!(networks[1].0, "torso");
        assert_eq!(
            networks[1].1,
            NetworkRange {
                wrapper_base: 6,
                wrapper_top: 8,
                device_base: 0,
                device_top: 2
            }
        );
    }

    #[test]
    fn short_range_is_rejected() {
        let spec = RangeSpec::Text("0 5 0".into());
        assert!(spec.parse("legs").is_err());
        let spec = RangeSpec::List(vec![0, -1, 0, 5]);
        assert!(spec.parse("legs").is_err());
    }

    #[test]
    fn name_without_slash_is_prefixed() {
        let mut cfg = two_part();
        cfg.name = Some("robot/lower".into());
        assert_eq!(cfg.part_name().unwrap(), "/robot/lower");
        cfg.name = None;
        assert!(cfg.part_name().is_err());
    }

    #[test]
    fn subdevice_and_networks_are_exclusive() {
        let mut cfg = two_part();
        cfg.subdevice = Some("sim".into());
        assert!(cfg.layout().is_err());
        cfg.networks.clear();
        assert_eq!(cfg.layout().unwrap(), Layout::Owned { kind: "sim".into() });
    }

    #[test]
    fn ros_group_modes() {
        let mut cfg = two_part();
        assert_eq!(cfg.ros_settings("/p").0, OutputMode::Disabled);
        cfg.ros = Some(RosConfig {
            use_ros: Some("only".into()),
            node_name: Some("/node".into()),
            topic_name: Some("/joint_states".into()),
            joint_names: None,
        });
        assert_eq!(cfg.ros_settings("/p").0, OutputMode::Only);
        cfg.ros = Some(RosConfig {
            use_ros: Some("sometimes".into()),
            ..RosConfig::default()
        });
        assert_eq!(cfg.ros_settings("/p").0, OutputMode::ConfigError);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn ros_joint_names_must_match_joint_count() {
        let mut cfg = two_part();
        cfg.ros = Some(RosConfig {
            use_ros: Some("true".into()),
            node_name: Some("/node".into()),
            topic_name: Some("/js".into()),
            joint_names: Some(vec!["a".into(), "b".into()]),
        });
        assert!(cfg.validate().is_err());
    }
}
