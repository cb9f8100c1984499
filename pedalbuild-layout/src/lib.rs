//! Component placement and wire routing for a dual-board breadboard.
//!
//! Turns a validated netlist + BOM into a hand-assemblable layout: every
//! component gets a legal hole position and every net gets wires or rail
//! attachments, with wire crossings and total length kept low.
//!
//! # Pipeline
//!
//! ```text
//! NetlistDef
//!   → Netlist            (validation, arena of components and nets)
//!   → SignalGraph        (BFS signal-flow depth from the input net)
//!   → FunctionalBlocks   (input, gain, tone, output, power)
//!   → Placement          (anchor-then-surround, left to right)   ┐
//!   → Routing            (rail drops, L-routes, A* fallback)     │ per seed
//!   → Score              (crossings, length, penalties)          ┘
//!   → LayoutResult       (best candidate, JSON-serializable)
//! ```
//!
//! The engine is a pure function of its inputs: no I/O happens between
//! [`generate_layout`] being called and it returning.

pub mod config;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod groups;
pub mod netlist;
pub mod optimize;
pub mod placement;
pub mod platform;
pub mod routing;
pub mod score;
pub mod types;

pub use config::LayoutConfig;
pub use error::{LayoutError, NetlistError};
pub use netlist::NetlistDef;
pub use optimize::SearchStats;
pub use types::LayoutResult;

use graph::SignalGraph;
use netlist::Netlist;
use optimize::Optimizer;
use platform::PlatformModel;

/// Generate the best layout found within the configured search budget.
///
/// Fails only on structurally invalid input (bad netlist or configuration),
/// before any placement is attempted. Components or nets the engine cannot
/// handle are listed in [`LayoutResult::unplaced`] and
/// [`LayoutResult::unrouted`] instead.
pub fn generate_layout(netlist: &NetlistDef, config: &LayoutConfig) -> Result<LayoutResult, LayoutError> {
    generate_layout_with_stats(netlist, config).map(|(result, _)| result)
}

/// Like [`generate_layout`], also returning optimizer bookkeeping.
pub fn generate_layout_with_stats(
    netlist: &NetlistDef,
    config: &LayoutConfig,
) -> Result<(LayoutResult, SearchStats), LayoutError> {
    config.validate()?;
    let netlist = Netlist::new(netlist, &config.power)?;
    let platform = PlatformModel::new(config.power.clone());

    let graph = SignalGraph::build(&netlist);
    let blocks = groups::detect_blocks(&netlist, &graph, &config.grouping);

    Ok(Optimizer::new(&platform, &netlist, &blocks, config).run())
}

/// Serialize a layout to pretty-printed JSON.
pub fn to_json(result: &LayoutResult) -> String {
    serde_json::to_string_pretty(result).expect("layout serialization should not fail")
}
