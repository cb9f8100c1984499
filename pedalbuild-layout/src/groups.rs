//! Functional block detection.
//!
//! Splits the components into input, gain, tone, output and power blocks by
//! their normalised signal-flow depth. Blocks come out in left-to-right
//! placement order. The result is deterministic for a given netlist.

use crate::config::GroupingConfig;
use crate::graph::SignalGraph;
use crate::netlist::{ComponentId, Footprint, Netlist};
use serde::{Deserialize, Serialize};

/// Circuit role of a block. Declaration order is placement priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Input,
    Gain,
    Tone,
    Output,
    /// Parts unreachable from the input (bias networks, filtering).
    Power,
    /// Parts with no net at all.
    Unassigned,
}

impl BlockKind {
    pub const ALL: [BlockKind; 6] = [
        BlockKind::Input,
        BlockKind::Gain,
        BlockKind::Tone,
        BlockKind::Output,
        BlockKind::Power,
        BlockKind::Unassigned,
    ];

    pub fn label(self) -> &'static str {
        match self {
            BlockKind::Input => "Input",
            BlockKind::Gain => "Gain Stage",
            BlockKind::Tone => "Tone Stack",
            BlockKind::Output => "Output",
            BlockKind::Power => "Power",
            BlockKind::Unassigned => "Unassigned",
        }
    }
}

/// A group of components placed together.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionalBlock {
    pub kind: BlockKind,
    pub label: String,
    /// Left-to-right rank; lower is placed first.
    pub priority: usize,
    /// Ordered by signal-flow depth, then input order.
    pub members: Vec<ComponentId>,
    /// Largest on-board part that is not a pot; placed first.
    pub anchor: Option<ComponentId>,
}

/// Assign every on-board component to exactly one block.
pub fn detect_blocks(netlist: &Netlist, graph: &SignalGraph, config: &GroupingConfig) -> Vec<FunctionalBlock> {
    let mut buckets: Vec<Vec<ComponentId>> = vec![Vec::new(); BlockKind::ALL.len()];

    for comp in &netlist.components {
        if comp.footprint == Footprint::OffBoard {
            continue;
        }
        let kind = comp
            .hint
            .unwrap_or_else(|| classify(netlist, graph, config, comp.index));
        buckets[kind as usize].push(comp.index);
    }

    let mut blocks = Vec::new();
    for (kind, mut members) in BlockKind::ALL.into_iter().zip(buckets) {
        if members.is_empty() {
            continue;
        }
        members.sort_by_key(|&c| (graph.depth(c).unwrap_or(usize::MAX), c));

        let anchor = members
            .iter()
            .copied()
            .filter(|&c| netlist.component(c).footprint != Footprint::Pot)
            .fold(None::<ComponentId>, |best, c| match best {
                Some(b) if netlist.component(b).size() >= netlist.component(c).size() => Some(b),
                _ => Some(c),
            });

        blocks.push(FunctionalBlock {
            kind,
            label: kind.label().to_string(),
            priority: blocks.len(),
            members,
            anchor,
        });
    }
    blocks
}

fn classify(netlist: &Netlist, graph: &SignalGraph, config: &GroupingConfig, component: ComponentId) -> BlockKind {
    if netlist.nets_of(component).is_empty() {
        return BlockKind::Unassigned;
    }
    if graph
        .output_net()
        .is_some_and(|out| graph.is_on_net(component, out))
    {
        return BlockKind::Output;
    }
    match graph.normalized_depth(component) {
        None => BlockKind::Power,
        Some(d) if d <= config.input_max => BlockKind::Input,
        Some(d) if d <= config.gain_max => BlockKind::Gain,
        Some(d) if d <= config.tone_max => BlockKind::Tone,
        Some(_) => BlockKind::Output,
    }
}
