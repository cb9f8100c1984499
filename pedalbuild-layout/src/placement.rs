//! Component placement.
//!
//! Blocks are laid out left to right in signal-flow order, filling board 1
//! before spilling onto board 2. Within a block the anchor goes down first
//! and the supporting parts are searched at growing column offsets around
//! it. Potentiometers skip all of this and take the fixed pot slots in block
//! priority order.
//!
//! Besides hole overlap, strips are kept net-exclusive: a strip holding a pin
//! of one net never receives a pin of another net, and a pin with no net
//! keeps its strip to itself.
//!
//! The seeded RNG only breaks ties (anchor choice among equal footprints,
//! orientation order, which side of the anchor is tried first), so one seed
//! always reproduces the same placement.

use crate::config::PlacementConfig;
use crate::error::PlacementError;
use crate::groups::FunctionalBlock;
use crate::netlist::{ComponentId, ComponentInstance, Footprint, NetId, Netlist};
use crate::platform::{HoleRef, Orientation, Placement, PlatformModel, Section, StripRef, GAP_BOTTOM_ROW, GAP_TOP_ROW};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Rows nearest a rail come first.
const RAIL_ROWS: [u8; 10] = [0, 9, 1, 8, 2, 7, 3, 6, 4, 5];
/// Rows away from the rails, keeping the gap rows free for DIPs.
const INNER_ROWS: [u8; 10] = [3, 6, 2, 7, 1, 8, 0, 9, 4, 5];

/// Who owns the electrical strip under a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StripOwner {
    Net(NetId),
    /// A pin with no net.
    Pin(ComponentId, usize),
}

/// Holes and strips taken so far.
#[derive(Debug, Default)]
struct Occupancy {
    holes: HashSet<HoleRef>,
    strips: HashMap<StripRef, StripOwner>,
}

/// Result of one placement pass.
#[derive(Debug, Clone)]
pub struct PlacementOutcome {
    /// Indexed by [`ComponentId`]; `None` for unplaced and off-board parts.
    pub placements: Vec<Option<Placement>>,
    pub failures: Vec<(ComponentId, PlacementError)>,
}

impl PlacementOutcome {
    pub fn placement(&self, component: ComponentId) -> Option<&Placement> {
        self.placements.get(component.0).and_then(Option::as_ref)
    }

    pub fn placed_count(&self) -> usize {
        self.placements.iter().filter(|p| p.is_some()).count()
    }
}

/// Place every on-board component of `blocks` using `seed` for tie-breaking.
pub fn place_components(
    platform: &PlatformModel,
    netlist: &Netlist,
    blocks: &[FunctionalBlock],
    config: &PlacementConfig,
    seed: u64,
) -> PlacementOutcome {
    let mut placer = Placer::new(platform, netlist, config, seed);
    placer.place_pots(blocks);
    for block in blocks {
        placer.place_block(block);
    }
    PlacementOutcome {
        placements: placer.placements,
        failures: placer.failures,
    }
}

struct Placer<'a> {
    platform: &'a PlatformModel,
    netlist: &'a Netlist,
    config: &'a PlacementConfig,
    rng: ChaCha8Rng,
    occupancy: Occupancy,
    placements: Vec<Option<Placement>>,
    failures: Vec<(ComponentId, PlacementError)>,
    /// Next free linear column for a block.
    cursor: usize,
}

impl<'a> Placer<'a> {
    fn new(platform: &'a PlatformModel, netlist: &'a Netlist, config: &'a PlacementConfig, seed: u64) -> Self {
        Self {
            platform,
            netlist,
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            occupancy: Occupancy::default(),
            placements: vec![None; netlist.components.len()],
            failures: Vec::new(),
            cursor: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Pots
    // -----------------------------------------------------------------------

    fn place_pots(&mut self, blocks: &[FunctionalBlock]) {
        let mut next_slot = 0;
        for block in blocks {
            for &cid in &block.members {
                let comp = self.netlist.component(cid);
                if comp.footprint != Footprint::Pot {
                    continue;
                }
                let slots = self.platform.pot_slots();
                let found = slots.iter().enumerate().skip(next_slot).find_map(|(i, slot)| {
                    let placement = Placement {
                        component: cid,
                        board: slot.board,
                        section: Section::of_row(slot.row)?,
                        row: slot.row,
                        column: slot.column,
                        orientation: Orientation::Horizontal,
                    };
                    self.fits(comp, &placement).then_some((i, placement))
                });
                match found {
                    Some((i, placement)) => {
                        next_slot = i + 1;
                        self.commit(comp, placement);
                    }
                    None => self.fail(comp, "no free potentiometer slot".to_string()),
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Blocks
    // -----------------------------------------------------------------------

    fn place_block(&mut self, block: &FunctionalBlock) {
        let members: Vec<ComponentId> = block
            .members
            .iter()
            .copied()
            .filter(|&c| self.netlist.component(c).footprint != Footprint::Pot)
            .collect();
        if members.is_empty() {
            return;
        }

        let anchor = self.pick_anchor(block, &members);
        let total = self.platform.total_columns();
        let start = (self.cursor + self.rng.gen_range(0..=self.config.block_gap)).min(total);

        let mut anchor_column = start;
        if let Some(anchor) = anchor {
            let comp = self.netlist.component(anchor);
            let order: Vec<usize> = (start..total).chain(0..start).collect();
            match self.search(comp, &order) {
                Some(p) => {
                    anchor_column = self.platform.linear_column(p.board, p.column);
                    self.commit(comp, p);
                }
                None => self.fail(comp, self.exhausted_reason()),
            }
        }

        for &cid in &members {
            if Some(cid) == anchor {
                continue;
            }
            let comp = self.netlist.component(cid);
            let mut order = self.concentric_columns(anchor_column, total);
            order.extend((start..total).chain(0..start));
            match self.search(comp, &order) {
                Some(p) => self.commit(comp, p),
                None => self.fail(comp, self.exhausted_reason()),
            }
        }

        let right_edge = members
            .iter()
            .filter_map(|&c| {
                let p = self.placements[c.0]?;
                self.platform
                    .occupied_holes(self.netlist.component(c), &p)
                    .iter()
                    .map(|h| self.platform.linear_column(h.board, h.column))
                    .max()
            })
            .max();
        if let Some(edge) = right_edge {
            self.cursor = self.cursor.max(edge + 1 + self.config.block_gap);
        }
        debug!(
            block = %block.label,
            members = members.len(),
            cursor = self.cursor,
            "placed block"
        );
    }

    /// The block anchor, or a random equally large part.
    fn pick_anchor(&mut self, block: &FunctionalBlock, members: &[ComponentId]) -> Option<ComponentId> {
        let anchor = block.anchor?;
        let size = self.netlist.component(anchor).size();
        let ties: Vec<ComponentId> = members
            .iter()
            .copied()
            .filter(|&c| self.netlist.component(c).size() == size)
            .collect();
        ties.choose(&mut self.rng).copied().or(Some(anchor))
    }

    /// `center, center±1, center±2, ...` up to the search radius, with the
    /// side tried first drawn from the RNG at each step.
    fn concentric_columns(&mut self, center: usize, total: usize) -> Vec<usize> {
        let mut out = Vec::new();
        if center < total {
            out.push(center);
        }
        for k in 1..=self.config.search_radius {
            let right = center.checked_add(k).filter(|&c| c < total);
            let left = center.checked_sub(k).filter(|&c| c < total);
            let pair = if self.rng.gen_bool(0.5) { [right, left] } else { [left, right] };
            out.extend(pair.into_iter().flatten());
        }
        out
    }

    /// First free position over the given linear columns, bounded by
    /// `max_attempts` candidate checks.
    fn search(&mut self, comp: &ComponentInstance, columns: &[usize]) -> Option<Placement> {
        let mut attempts = 0;
        let mut tried: HashSet<usize> = HashSet::new();
        for &linear in columns {
            if !tried.insert(linear) {
                continue;
            }
            let Some((board, column)) = self.platform.from_linear_column(linear) else {
                continue;
            };
            let mut orientations = match comp.footprint {
                Footprint::TwoLead => vec![Orientation::Horizontal, Orientation::Vertical],
                _ => vec![Orientation::Horizontal],
            };
            orientations.shuffle(&mut self.rng);

            for orientation in orientations {
                for row in self.candidate_rows(comp, orientation) {
                    if attempts >= self.config.max_attempts {
                        return None;
                    }
                    attempts += 1;
                    let Some(section) = Section::of_row(row) else {
                        continue;
                    };
                    let placement = Placement {
                        component: comp.index,
                        board,
                        section,
                        row,
                        column,
                        orientation,
                    };
                    if self.fits(comp, &placement) {
                        return Some(placement);
                    }
                }
            }
        }
        None
    }

    fn candidate_rows(&self, comp: &ComponentInstance, orientation: Orientation) -> Vec<u8> {
        match (comp.footprint, orientation) {
            (Footprint::Dip, _) => vec![GAP_TOP_ROW],
            (Footprint::TwoLead, Orientation::Vertical) => {
                // Start rows whose lead span reaches across the gap.
                let reach = comp.span.saturating_sub(1).min(GAP_BOTTOM_ROW as usize) as u8;
                (GAP_BOTTOM_ROW - reach..=GAP_TOP_ROW).rev().collect()
            }
            _ if self.netlist.is_supply_connected(comp.index) => RAIL_ROWS.to_vec(),
            _ => INNER_ROWS.to_vec(),
        }
    }

    fn strip_owner(&self, component: ComponentId, pin: usize) -> StripOwner {
        match self.netlist.net_of_pin(component, pin) {
            Some(net) => StripOwner::Net(net),
            None => StripOwner::Pin(component, pin),
        }
    }

    /// Legal, clear of every placed body, and strip-compatible.
    fn fits(&self, comp: &ComponentInstance, p: &Placement) -> bool {
        if !self.platform.is_free_position(
            comp,
            p.board,
            p.section,
            p.row,
            p.column,
            p.orientation,
            &self.occupancy.holes,
        ) {
            return false;
        }
        self.platform
            .pin_holes(comp, p)
            .iter()
            .enumerate()
            .all(|(i, &hole)| {
                let owner = self.strip_owner(comp.index, i + 1);
                self.platform
                    .strip_of(hole)
                    .is_some_and(|s| self.occupancy.strips.get(&s).map_or(true, |o| *o == owner))
            })
    }

    fn commit(&mut self, comp: &ComponentInstance, p: Placement) {
        for hole in self.platform.occupied_holes(comp, &p) {
            self.occupancy.holes.insert(hole);
        }
        for (i, hole) in self.platform.pin_holes(comp, &p).into_iter().enumerate() {
            if let Some(strip) = self.platform.strip_of(hole) {
                let owner = self.strip_owner(comp.index, i + 1);
                self.occupancy.strips.insert(strip, owner);
            }
        }
        self.placements[comp.index.0] = Some(p);
    }

    fn fail(&mut self, comp: &ComponentInstance, reason: String) {
        warn!(component = %comp.id, %reason, "component not placed");
        self.failures.push((
            comp.index,
            PlacementError::CapacityExceeded {
                component: comp.id.clone(),
                reason,
            },
        ));
    }

    fn exhausted_reason(&self) -> String {
        format!(
            "no free position on either board within {} attempts",
            self.config.max_attempts
        )
    }
}
