//! Error types for the layout engine.
//!
//! Only [`LayoutError`] aborts a run. [`PlacementError`] and [`RoutingError`]
//! are recorded per candidate and surface in the final
//! [`LayoutResult`](crate::types::LayoutResult) as unplaced components and
//! unrouted nets.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structural problems with the input netlist. Always fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetlistError {
    #[error("duplicate component id `{0}`")]
    DuplicateComponent(String),
    #[error("duplicate net id `{0}`")]
    DuplicateNet(String),
    #[error("net `{net}` references unknown component `{component}`")]
    UnknownComponent { net: String, component: String },
    #[error("net `{net}` references pin {pin} of `{component}`, which has {pin_count} pins")]
    PinOutOfRange {
        net: String,
        component: String,
        pin: usize,
        pin_count: usize,
    },
    #[error("net `{net}` needs at least two connection points")]
    NetTooSmall { net: String },
    #[error("pin {pin} of `{component}` appears in more than one net")]
    PinInMultipleNets { component: String, pin: usize },
    #[error("net `{net}` is tied to both the positive and the negative rail")]
    ConflictingSupply { net: String },
    #[error("declared signal net `{net}` does not exist")]
    UnknownSignalNet { net: String },
    #[error("failed to parse netlist: {0}")]
    Parse(String),
}

/// A component that could not be given a legal position.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementError {
    #[error("no legal position for `{component}`: {reason}")]
    CapacityExceeded { component: String, reason: String },
}

/// A net for which no wire path was found.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingError {
    #[error("net `{net}` is unroutable: {reason}")]
    UnroutableNet { net: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level error returned by [`crate::generate_layout`].
#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("invalid netlist: {0}")]
    InvalidNetlist(#[from] NetlistError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
