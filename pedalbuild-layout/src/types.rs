//! Output types of the layout engine.
//!
//! All types derive [`serde::Serialize`] and [`serde::Deserialize`] so a
//! [`LayoutResult`] can be handed to the export collaborators as JSON.

use crate::geometry::GridPoint;
use crate::groups::BlockKind;
use crate::netlist::{ComponentKind, NetRole};
use crate::platform::{Board, HoleRef, JumperPoint, Orientation, RailRef, Section};
use serde::{Deserialize, Serialize};

/// Complete layout of one candidate, the output of [`crate::generate_layout`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
    /// Placed components in input order.
    pub placements: Vec<PlacedComponent>,
    /// One route per input net, in input order.
    pub routes: Vec<RoutedNet>,
    /// Components that need manual placement.
    pub unplaced: Vec<UnplacedComponent>,
    /// Nets that need manual wiring.
    pub unrouted: Vec<UnroutedNet>,
    /// Enclosure hardware that never goes on the board.
    pub off_board: Vec<String>,
    pub stats: LayoutStats,
    /// Lower is better.
    pub score: f64,
    /// Seed of the candidate this layout came from.
    pub seed: u64,
}

impl LayoutResult {
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty() && self.unrouted.is_empty()
    }

    /// Every point-to-point wire of every routed net.
    pub fn wires(&self) -> impl Iterator<Item = &Wire> {
        self.routes.iter().flat_map(|r| match &r.route {
            NetRoute::Wired { wires } => wires.as_slice(),
            _ => &[][..],
        })
    }

    pub fn attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.routes.iter().flat_map(|r| match &r.route {
            NetRoute::RailAttachment { attachments } => attachments.as_slice(),
            _ => &[][..],
        })
    }
}

/// A component with its assigned position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedComponent {
    /// Reference designator (e.g. `"IC1"`).
    pub component: String,
    pub kind: ComponentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub block: BlockKind,
    pub board: Board,
    pub section: Section,
    pub row: u8,
    pub column: u8,
    pub orientation: Orientation,
    /// Hole of each pin, pin 1 first.
    pub pins: Vec<HoleRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnplacedComponent {
    pub component: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnroutedNet {
    pub net: String,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

/// Wire color, derived from the net role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireColor {
    Red,
    Black,
    Blue,
    White,
}

impl From<NetRole> for WireColor {
    fn from(role: NetRole) -> Self {
        match role {
            NetRole::Power => WireColor::Red,
            NetRole::Ground => WireColor::Black,
            NetRole::Signal => WireColor::Blue,
            NetRole::Control => WireColor::White,
        }
    }
}

/// Where a wire lead goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Hole(HoleRef),
    Rail(RailRef),
    Jumper(JumperPoint),
}

impl Endpoint {
    /// Board the endpoint sits on. The jumper bank belongs to board 1.
    pub fn board(&self) -> Board {
        match self {
            Endpoint::Hole(h) => h.board,
            Endpoint::Rail(r) => r.board,
            Endpoint::Jumper(_) => Board::One,
        }
    }
}

/// A point-to-point wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wire {
    pub a: Endpoint,
    pub b: Endpoint,
    pub color: WireColor,
    /// Corner points on the global grid, `a` first.
    pub path: Vec<GridPoint>,
    /// Manhattan length in holes.
    pub length: u32,
    /// Wires already on the board that this one crosses.
    pub crossings: usize,
    /// Endpoints on different boards.
    pub board_crossing: bool,
}

/// A lead dropped straight onto a rail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub from: Endpoint,
    pub rail: RailRef,
    pub length: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NetRoute {
    Wired { wires: Vec<Wire> },
    RailAttachment { attachments: Vec<Attachment> },
    Unroutable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutedNet {
    pub net: String,
    pub role: NetRole,
    pub route: NetRoute,
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Aggregate figures of one layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutStats {
    pub crossings_count: usize,
    /// Wire plus rail-attachment length, in holes.
    pub total_wire_length: u64,
    pub wire_count: usize,
    pub rail_attachments: usize,
    pub board_crossings: usize,
    pub unplaced: usize,
    pub unrouted: usize,
}
