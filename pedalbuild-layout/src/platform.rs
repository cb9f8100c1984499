//! Static description of the dual-board breadboard platform.
//!
//! Each board has 10 rows (`a`–`j`, numbered 0–9) by 63 columns (1–63). Rows
//! 0–4 form the top section and rows 5–9 the bottom section; the through-hole
//! gap runs between rows 4 and 5. The five holes of one section in one column
//! are a single electrical strip. Each board carries four rails: a positive and
//! a negative rail above the top section and below the bottom section.
//!
//! Global grid (per board, y downward):
//!
//! ```text
//!  y=0   + rail (top)
//!  y=1   - rail (top)
//!  y=2..6  rows a-e   (top section)
//!  y=7     gap
//!  y=8..12 rows f-j   (bottom section)
//!  y=13  - rail (bottom)
//!  y=14  + rail (bottom)
//! ```
//!
//! Board 2 sits to the right of board 1. The jumper bank is a single column
//! of nine named points left of board 1.
//!
//! All queries are pure and never panic: out-of-range input yields `false`,
//! `None` or an empty collection.

use crate::geometry::GridPoint;
use crate::netlist::{ComponentInstance, Footprint};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub const ROWS: u8 = 10;
pub const COLUMNS: u8 = 63;
/// Last row of the top section; DIP packages start here.
pub const GAP_TOP_ROW: u8 = 4;
pub const GAP_BOTTOM_ROW: u8 = 5;
pub const POT_SLOT_PINS: u8 = 3;

const BOARD_SPACING: i32 = 3;
const JUMPER_BANK_X: i32 = -3;
const TOP_ROW_Y: i32 = 2;
const BOTTOM_ROW_Y: i32 = 8;
const GRID_HEIGHT: i32 = 15;

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Board {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
}

impl Board {
    pub const ALL: [Board; 2] = [Board::One, Board::Two];

    pub fn index(self) -> usize {
        match self {
            Board::One => 0,
            Board::Two => 1,
        }
    }

    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Top,
    Bottom,
}

impl Section {
    pub fn of_row(row: u8) -> Option<Section> {
        match row {
            0..=GAP_TOP_ROW => Some(Section::Top),
            GAP_BOTTOM_ROW..=9 => Some(Section::Bottom),
            _ => None,
        }
    }

    pub fn rows(self) -> std::ops::RangeInclusive<u8> {
        match self {
            Section::Top => 0..=GAP_TOP_ROW,
            Section::Bottom => GAP_BOTTOM_ROW..=ROWS - 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Positive,
    Negative,
}

/// One hole on one board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HoleRef {
    pub board: Board,
    /// 0 (`a`) to 9 (`j`).
    pub row: u8,
    /// 1 to 63.
    pub column: u8,
}

impl HoleRef {
    pub const fn new(board: Board, row: u8, column: u8) -> Self {
        Self { board, row, column }
    }

    pub fn section(&self) -> Option<Section> {
        Section::of_row(self.row)
    }

    pub fn row_letter(&self) -> char {
        (b'a' + self.row.min(25)) as char
    }
}

impl fmt::Display for HoleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}:{}{}", self.board.number(), self.row_letter(), self.column)
    }
}

/// The five electrically connected holes of one column in one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StripRef {
    pub board: Board,
    pub section: Section,
    pub column: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RailRef {
    pub board: Board,
    /// The section this rail runs alongside.
    pub side: Section,
    pub polarity: Polarity,
}

impl fmt::Display for RailRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = match self.side {
            Section::Top => "top",
            Section::Bottom => "bottom",
        };
        let sign = match self.polarity {
            Polarity::Positive => '+',
            Polarity::Negative => '-',
        };
        write!(f, "B{}-{side}{sign}", self.board.number())
    }
}

// ---------------------------------------------------------------------------
// Jumper bank and pot slots
// ---------------------------------------------------------------------------

/// Named external connection points of the jumper bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JumperPoint {
    #[serde(rename = "INPUT")]
    Input,
    #[serde(rename = "GND")]
    Gnd,
    #[serde(rename = "3V3")]
    V3v3,
    #[serde(rename = "REF")]
    Ref,
    #[serde(rename = "5V")]
    V5,
    #[serde(rename = "9V")]
    V9,
    #[serde(rename = "-9V")]
    VNeg9,
    #[serde(rename = "18V")]
    V18,
    #[serde(rename = "OUTPUT")]
    Output,
}

impl JumperPoint {
    pub const ALL: [JumperPoint; 9] = [
        JumperPoint::Input,
        JumperPoint::Gnd,
        JumperPoint::V3v3,
        JumperPoint::Ref,
        JumperPoint::V5,
        JumperPoint::V9,
        JumperPoint::VNeg9,
        JumperPoint::V18,
        JumperPoint::Output,
    ];

    pub fn name(self) -> &'static str {
        match self {
            JumperPoint::Input => "INPUT",
            JumperPoint::Gnd => "GND",
            JumperPoint::V3v3 => "3V3",
            JumperPoint::Ref => "REF",
            JumperPoint::V5 => "5V",
            JumperPoint::V9 => "9V",
            JumperPoint::VNeg9 => "-9V",
            JumperPoint::V18 => "18V",
            JumperPoint::Output => "OUTPUT",
        }
    }

    fn bank_index(self) -> usize {
        JumperPoint::ALL.iter().position(|&j| j == self).unwrap_or(0)
    }
}

impl fmt::Display for JumperPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fixed three-hole position reserved for a potentiometer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PotSlot {
    /// Left-to-right slot order; lower indices go to earlier signal stages.
    pub index: usize,
    pub board: Board,
    pub row: u8,
    /// Column of the first pot pin.
    pub column: u8,
}

impl PotSlot {
    pub fn holes(&self) -> Vec<HoleRef> {
        (0..POT_SLOT_PINS)
            .map(|i| HoleRef::new(self.board, self.row, self.column + i))
            .collect()
    }
}

/// Which jumpers feed the rails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerRailConfig {
    /// Supply voltage on the positive rails.
    #[serde(default = "default_voltage")]
    pub voltage: f64,
    /// Jumper feeding the positive rails.
    #[serde(default = "default_positive_supply")]
    pub positive_supply: JumperPoint,
    /// Jumper feeding the negative rails.
    #[serde(default = "default_ground")]
    pub ground: JumperPoint,
}

fn default_voltage() -> f64 { 9.0 }
fn default_positive_supply() -> JumperPoint { JumperPoint::V9 }
fn default_ground() -> JumperPoint { JumperPoint::Gnd }

impl Default for PowerRailConfig {
    fn default() -> Self {
        Self {
            voltage: default_voltage(),
            positive_supply: default_positive_supply(),
            ground: default_ground(),
        }
    }
}

impl PowerRailConfig {
    /// Rail polarity fed by a jumper, if it feeds one.
    pub fn rail_polarity(&self, jumper: JumperPoint) -> Option<Polarity> {
        if jumper == self.positive_supply {
            Some(Polarity::Positive)
        } else if jumper == self.ground {
            Some(Polarity::Negative)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Platform model
// ---------------------------------------------------------------------------

/// Immutable platform geometry plus legality queries.
#[derive(Debug, Clone)]
pub struct PlatformModel {
    power: PowerRailConfig,
    pot_slots: Vec<PotSlot>,
    reserved: HashSet<HoleRef>,
}

impl Default for PlatformModel {
    fn default() -> Self {
        Self::new(PowerRailConfig::default())
    }
}

impl PlatformModel {
    pub fn new(power: PowerRailConfig) -> Self {
        // Three slots per board along row j, left to right.
        let pot_slots: Vec<PotSlot> = Board::ALL
            .iter()
            .flat_map(|&board| [8u8, 28, 48].map(|column| (board, column)))
            .enumerate()
            .map(|(index, (board, column))| PotSlot {
                index,
                board,
                row: ROWS - 1,
                column,
            })
            .collect();
        let reserved = pot_slots.iter().flat_map(PotSlot::holes).collect();
        Self {
            power,
            pot_slots,
            reserved,
        }
    }

    pub fn power(&self) -> &PowerRailConfig {
        &self.power
    }

    pub fn pot_slots(&self) -> &[PotSlot] {
        &self.pot_slots
    }

    pub fn pot_slot_at(&self, board: Board, row: u8, column: u8) -> Option<&PotSlot> {
        self.pot_slots
            .iter()
            .find(|s| s.board == board && s.row == row && s.column == column)
    }

    pub fn contains(&self, hole: HoleRef) -> bool {
        hole.row < ROWS && (1..=COLUMNS).contains(&hole.column)
    }

    /// Holes reserved for potentiometer slots.
    pub fn is_reserved(&self, hole: HoleRef) -> bool {
        self.reserved.contains(&hole)
    }

    pub fn strip_of(&self, hole: HoleRef) -> Option<StripRef> {
        if !self.contains(hole) {
            return None;
        }
        let section = hole.section()?;
        Some(StripRef {
            board: hole.board,
            section,
            column: hole.column,
        })
    }

    pub fn strip_holes(&self, strip: StripRef) -> Vec<HoleRef> {
        if !(1..=COLUMNS).contains(&strip.column) {
            return Vec::new();
        }
        strip
            .section
            .rows()
            .map(|row| HoleRef::new(strip.board, row, strip.column))
            .collect()
    }

    /// The same-polarity rail running alongside the hole's section.
    pub fn nearest_rail(&self, hole: HoleRef, polarity: Polarity) -> Option<RailRef> {
        if !self.contains(hole) {
            return None;
        }
        Some(RailRef {
            board: hole.board,
            side: hole.section()?,
            polarity,
        })
    }

    // -----------------------------------------------------------------------
    // Footprints
    // -----------------------------------------------------------------------

    /// Pin offsets `(d_row, d_col)` relative to the placement origin, in pin
    /// order (index 0 is pin 1). `None` when the footprint cannot take this
    /// orientation.
    pub fn pin_offsets(&self, component: &ComponentInstance, orientation: Orientation) -> Option<Vec<(u8, u8)>> {
        let span = u8::try_from(component.span).ok()?;
        let pins = u8::try_from(component.pin_count).ok()?;
        match (component.footprint, orientation) {
            (Footprint::TwoLead, Orientation::Horizontal) if span >= 2 => Some(vec![(0, 0), (0, span - 1)]),
            (Footprint::TwoLead, Orientation::Vertical) if span >= 2 => Some(vec![(0, 0), (span - 1, 0)]),
            (Footprint::Inline, Orientation::Horizontal) if pins >= 1 && span >= pins => {
                if pins == 1 {
                    return Some(vec![(0, 0)]);
                }
                let (span, pins) = (span as u16, pins as u16);
                Some((0..pins).map(|i| (0, (i * (span - 1) / (pins - 1)) as u8)).collect())
            }
            (Footprint::Dip, Orientation::Horizontal) if pins >= 2 && pins % 2 == 0 => {
                // Pin 1 bottom-left, counter-clockwise, as seen with the notch left.
                let half = pins / 2;
                let bottom = (0..half).map(|i| (1, i));
                let top = (0..half).rev().map(|i| (0, i));
                Some(bottom.chain(top).collect())
            }
            (Footprint::Pot, Orientation::Horizontal) if (1..=POT_SLOT_PINS).contains(&pins) => {
                Some((0..pins).map(|i| (0, i)).collect())
            }
            _ => None,
        }
    }

    /// Offsets of every hole the body covers, relative to the origin.
    fn body_offsets(&self, component: &ComponentInstance, orientation: Orientation) -> Option<Vec<(u8, u8)>> {
        let pins = self.pin_offsets(component, orientation)?;
        let span = component.span as u8;
        Some(match (component.footprint, orientation) {
            (Footprint::TwoLead, Orientation::Vertical) => (0..span).map(|r| (r, 0)).collect(),
            (Footprint::TwoLead | Footprint::Inline, Orientation::Horizontal) => (0..span).map(|c| (0, c)).collect(),
            (Footprint::Dip, _) => {
                let half = (component.pin_count / 2) as u8;
                (0..2).flat_map(|r| (0..half).map(move |c| (r, c))).collect()
            }
            _ => pins,
        })
    }

    fn offset_holes(board: Board, row: u8, column: u8, offsets: &[(u8, u8)]) -> Vec<HoleRef> {
        offsets
            .iter()
            .map(|&(dr, dc)| HoleRef::new(board, row.saturating_add(dr), column.saturating_add(dc)))
            .collect()
    }

    /// Is this position legal for the component on an empty platform?
    ///
    /// Checks extent, section consistency, footprint rules (DIPs straddle the
    /// gap, vertical two-lead parts cross it, pots sit in slots), reserved
    /// pot holes, and that no two pins land on the same strip.
    pub fn is_legal_position(
        &self,
        component: &ComponentInstance,
        board: Board,
        section: Section,
        row: u8,
        column: u8,
        orientation: Orientation,
    ) -> bool {
        if Section::of_row(row) != Some(section) || !self.contains(HoleRef::new(board, row, column)) {
            return false;
        }
        let (Some(pins), Some(body)) = (
            self.pin_offsets(component, orientation),
            self.body_offsets(component, orientation),
        ) else {
            return false;
        };
        let pin_holes = Self::offset_holes(board, row, column, &pins);
        let body_holes = Self::offset_holes(board, row, column, &body);
        if body_holes.iter().any(|&h| !self.contains(h)) {
            return false;
        }

        match component.footprint {
            Footprint::Pot => {
                if self.pot_slot_at(board, row, column).is_none() {
                    return false;
                }
            }
            Footprint::Dip => {
                if row != GAP_TOP_ROW {
                    return false;
                }
            }
            Footprint::TwoLead if orientation == Orientation::Vertical => {
                let last = row + component.span as u8 - 1;
                if !(row <= GAP_TOP_ROW && last >= GAP_BOTTOM_ROW) {
                    return false;
                }
            }
            Footprint::OffBoard => return false,
            _ => {}
        }

        if component.footprint != Footprint::Pot && body_holes.iter().any(|&h| self.is_reserved(h)) {
            return false;
        }

        let mut strips = HashSet::new();
        pin_holes
            .iter()
            .all(|&h| self.strip_of(h).is_some_and(|s| strips.insert(s)))
    }

    /// Legal on the platform and clear of every hole in `occupied`.
    pub fn is_free_position(
        &self,
        component: &ComponentInstance,
        board: Board,
        section: Section,
        row: u8,
        column: u8,
        orientation: Orientation,
        occupied: &HashSet<HoleRef>,
    ) -> bool {
        self.is_legal_position(component, board, section, row, column, orientation)
            && self
                .body_holes(component, board, row, column, orientation)
                .iter()
                .all(|h| !occupied.contains(h))
    }

    fn body_holes(&self, component: &ComponentInstance, board: Board, row: u8, column: u8, orientation: Orientation) -> Vec<HoleRef> {
        self.body_offsets(component, orientation)
            .map(|offsets| Self::offset_holes(board, row, column, &offsets))
            .unwrap_or_default()
    }

    /// Every hole a placed component covers. Empty for illegal placements.
    pub fn occupied_holes(&self, component: &ComponentInstance, placement: &Placement) -> Vec<HoleRef> {
        if !self.is_legal_position(
            component,
            placement.board,
            placement.section,
            placement.row,
            placement.column,
            placement.orientation,
        ) {
            return Vec::new();
        }
        self.body_holes(component, placement.board, placement.row, placement.column, placement.orientation)
    }

    /// Hole of each pin, in pin order. Empty for illegal placements.
    pub fn pin_holes(&self, component: &ComponentInstance, placement: &Placement) -> Vec<HoleRef> {
        if !self.is_legal_position(
            component,
            placement.board,
            placement.section,
            placement.row,
            placement.column,
            placement.orientation,
        ) {
            return Vec::new();
        }
        self.pin_offsets(component, placement.orientation)
            .map(|offsets| Self::offset_holes(placement.board, placement.row, placement.column, &offsets))
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Column order and grid mapping
    // -----------------------------------------------------------------------

    /// Number of columns across both boards.
    pub fn total_columns(&self) -> usize {
        Board::ALL.len() * COLUMNS as usize
    }

    /// Left-to-right column index across both boards (board 1 first).
    pub fn linear_column(&self, board: Board, column: u8) -> usize {
        board.index() * COLUMNS as usize + (column as usize).saturating_sub(1)
    }

    pub fn from_linear_column(&self, linear: usize) -> Option<(Board, u8)> {
        let board = *Board::ALL.get(linear / COLUMNS as usize)?;
        Some((board, (linear % COLUMNS as usize) as u8 + 1))
    }

    fn board_x(board: Board) -> i32 {
        board.index() as i32 * (COLUMNS as i32 + BOARD_SPACING)
    }

    pub fn grid_point(&self, hole: HoleRef) -> GridPoint {
        let x = Self::board_x(hole.board) + hole.column as i32 - 1;
        let y = if hole.row <= GAP_TOP_ROW {
            TOP_ROW_Y + hole.row as i32
        } else {
            BOTTOM_ROW_Y + (hole.row - GAP_BOTTOM_ROW) as i32
        };
        GridPoint::new(x, y)
    }

    pub fn rail_y(&self, rail: RailRef) -> i32 {
        match (rail.side, rail.polarity) {
            (Section::Top, Polarity::Positive) => 0,
            (Section::Top, Polarity::Negative) => 1,
            (Section::Bottom, Polarity::Negative) => GRID_HEIGHT - 2,
            (Section::Bottom, Polarity::Positive) => GRID_HEIGHT - 1,
        }
    }

    /// Where a lead dropped straight from `x` meets the rail.
    pub fn rail_point(&self, rail: RailRef, x: i32) -> GridPoint {
        let min_x = Self::board_x(rail.board);
        let max_x = min_x + COLUMNS as i32 - 1;
        GridPoint::new(x.clamp(min_x, max_x), self.rail_y(rail))
    }

    pub fn jumper_point(&self, jumper: JumperPoint) -> GridPoint {
        GridPoint::new(JUMPER_BANK_X, TOP_ROW_Y + jumper.bank_index() as i32)
    }

    /// Inclusive grid extent, with a one-cell margin for routing around the edges.
    pub fn grid_bounds(&self) -> (GridPoint, GridPoint) {
        let max_x = Self::board_x(Board::Two) + COLUMNS as i32;
        (GridPoint::new(JUMPER_BANK_X - 1, -1), GridPoint::new(max_x, GRID_HEIGHT))
    }
}

/// Physical position of one component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub component: crate::netlist::ComponentId,
    pub board: Board,
    pub section: Section,
    pub row: u8,
    pub column: u8,
    pub orientation: Orientation,
}
