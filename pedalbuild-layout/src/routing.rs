//! Net routing.
//!
//! Power and ground nets are routed first and never get point-to-point
//! wires: each strip holding a supply pin drops a lead onto the nearest rail
//! of the right polarity. Signal and control nets are routed afterwards,
//! smallest first. Their terminals (pin strips and jumpers) are sorted left to
//! right and chained pairwise. Each link is straight when the endpoints line
//! up, otherwise the L-route (horizontal-first or vertical-first) that crosses
//! fewer existing wires. When both L-routes are congested an A* search over
//! the hole grid is tried, with existing wires as soft cost rather than
//! obstacles.
//!
//! Pins of off-board hardware are left to the enclosure wiring and do not
//! take part in board routing. Every lead needs a free hole on its strip;
//! a full strip makes the net unroutable.

use crate::config::RoutingConfig;
use crate::error::RoutingError;
use crate::geometry::{crossings_against, path_length, segments_of, simplify_path, GridPoint, Segment};
use crate::netlist::{Footprint, Net, NetId, Netlist, Terminal};
use crate::placement::PlacementOutcome;
use crate::platform::{Board, HoleRef, JumperPoint, Polarity, PlatformModel, RailRef, Section, StripRef};
use crate::types::{Attachment, Endpoint, NetRoute, RoutedNet, Wire, WireColor};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use tracing::{trace, warn};

/// Routes of one candidate, in net order.
#[derive(Debug, Clone)]
pub struct RoutingOutcome {
    pub routes: Vec<RoutedNet>,
    pub failures: Vec<(NetId, RoutingError)>,
}

/// Route every net of the netlist over a finished placement.
pub fn route_nets(
    platform: &PlatformModel,
    netlist: &Netlist,
    placement: &PlacementOutcome,
    config: &RoutingConfig,
) -> RoutingOutcome {
    let mut router = Router::new(platform, netlist, placement, config);

    let (supply, mut signal): (Vec<&Net>, Vec<&Net>) = netlist.nets.iter().partition(|n| n.is_supply());
    signal.sort_by_cached_key(|n| (router.extent(n), n.index));

    let mut routes: Vec<Option<RoutedNet>> = vec![None; netlist.nets.len()];
    for net in supply.into_iter().chain(signal) {
        routes[net.index.0] = Some(router.route_net(net));
    }

    RoutingOutcome {
        routes: routes.into_iter().flatten().collect(),
        failures: router.failures,
    }
}

/// A stop along a signal net.
#[derive(Debug, Clone, Copy)]
enum Stop {
    /// A pin strip, with the first pin hole on it.
    Strip(StripRef, HoleRef),
    Jumper(JumperPoint),
}

struct Router<'a> {
    platform: &'a PlatformModel,
    netlist: &'a Netlist,
    placement: &'a PlacementOutcome,
    config: &'a RoutingConfig,
    /// Holes taken by component bodies and wire leads.
    used: HashSet<HoleRef>,
    segments: Vec<Segment>,
    /// How many wires pass over each grid cell.
    cover: HashMap<GridPoint, u32>,
    failures: Vec<(NetId, RoutingError)>,
}

impl<'a> Router<'a> {
    fn new(
        platform: &'a PlatformModel,
        netlist: &'a Netlist,
        placement: &'a PlacementOutcome,
        config: &'a RoutingConfig,
    ) -> Self {
        let used = netlist
            .components
            .iter()
            .filter_map(|c| placement.placement(c.index).map(|p| platform.occupied_holes(c, p)))
            .flatten()
            .collect();
        Self {
            platform,
            netlist,
            placement,
            config,
            used,
            segments: Vec::new(),
            cover: HashMap::new(),
            failures: Vec::new(),
        }
    }

    fn route_net(&mut self, net: &Net) -> RoutedNet {
        let route = match self.try_route(net) {
            Ok(route) => route,
            Err(err) => {
                warn!(net = %net.id, error = %err, "net not routed");
                let RoutingError::UnroutableNet { reason, .. } = &err;
                let reason = reason.clone();
                self.failures.push((net.index, err));
                NetRoute::Unroutable { reason }
            }
        };
        RoutedNet {
            net: net.id.clone(),
            role: net.role,
            route,
        }
    }

    fn try_route(&mut self, net: &Net) -> Result<NetRoute, RoutingError> {
        let pins = self.pin_holes(net)?;
        match net.role.rail_polarity() {
            Some(polarity) => self.attach_to_rails(net, &pins, polarity),
            None => self.wire_signal(net, &pins),
        }
    }

    /// Board pin holes of a net, failing when a component is not placed.
    fn pin_holes(&self, net: &Net) -> Result<Vec<HoleRef>, RoutingError> {
        net.pins
            .iter()
            .filter(|&&(cid, _)| self.netlist.component(cid).footprint != Footprint::OffBoard)
            .map(|&(cid, pin)| {
                let comp = self.netlist.component(cid);
                self.placement
                    .placement(cid)
                    .and_then(|p| self.platform.pin_holes(comp, p).get(pin - 1).copied())
                    .ok_or_else(|| unroutable(net, format!("component `{}` is not placed", comp.id)))
            })
            .collect()
    }

    fn distinct_strips(&self, pins: &[HoleRef]) -> Vec<(StripRef, HoleRef)> {
        let mut out: Vec<(StripRef, HoleRef)> = Vec::new();
        for &hole in pins {
            if let Some(strip) = self.platform.strip_of(hole) {
                if !out.iter().any(|(s, _)| *s == strip) {
                    out.push((strip, hole));
                }
            }
        }
        out
    }

    /// Half-perimeter of the net's bounding box; small nets route first.
    fn extent(&self, net: &Net) -> u32 {
        let mut points: Vec<GridPoint> = self
            .pin_holes(net)
            .unwrap_or_default()
            .into_iter()
            .map(|h| self.platform.grid_point(h))
            .collect();
        points.extend(net.terminals.iter().filter_map(|t| match t {
            Terminal::Jumper(j) => Some(self.platform.jumper_point(*j)),
            Terminal::Rail(_) => None,
        }));
        let (Some(min_x), Some(max_x)) = (points.iter().map(|p| p.x).min(), points.iter().map(|p| p.x).max()) else {
            return 0;
        };
        let min_y = points.iter().map(|p| p.y).min().unwrap_or(0);
        let max_y = points.iter().map(|p| p.y).max().unwrap_or(0);
        min_x.abs_diff(max_x) + min_y.abs_diff(max_y)
    }

    /// Free hole of a strip minimising `key`, ties to the lower row.
    fn free_hole(&self, strip: StripRef, key: impl Fn(GridPoint) -> u32) -> Option<HoleRef> {
        self.platform
            .strip_holes(strip)
            .into_iter()
            .filter(|h| !self.used.contains(h))
            .min_by_key(|&h| (key(self.platform.grid_point(h)), h.row))
    }

    // -----------------------------------------------------------------------
    // Supply nets
    // -----------------------------------------------------------------------

    fn attach_to_rails(&mut self, net: &Net, pins: &[HoleRef], polarity: Polarity) -> Result<NetRoute, RoutingError> {
        let mut attachments = Vec::new();

        for (strip, pin) in self.distinct_strips(pins) {
            let Some(rail) = self.platform.nearest_rail(pin, polarity) else {
                continue;
            };
            let rail_y = self.platform.rail_y(rail);
            let hole = self
                .free_hole(strip, |p| p.y.abs_diff(rail_y))
                .ok_or_else(|| full_strip(net, pin))?;
            self.used.insert(hole);
            attachments.push(Attachment {
                from: Endpoint::Hole(hole),
                rail,
                length: self.platform.grid_point(hole).y.abs_diff(rail_y),
            });
        }

        // Jumpers that do not already feed this polarity get a lead to the
        // top rail of board 1, next to the jumper bank.
        for t in &net.terminals {
            let Terminal::Jumper(j) = *t else {
                continue;
            };
            if self.platform.power().rail_polarity(j) == Some(polarity) {
                continue;
            }
            let rail = RailRef {
                board: Board::One,
                side: Section::Top,
                polarity,
            };
            let from = self.platform.jumper_point(j);
            let to = self.platform.rail_point(rail, from.x);
            attachments.push(Attachment {
                from: Endpoint::Jumper(j),
                rail,
                length: from.manhattan(to),
            });
        }

        Ok(NetRoute::RailAttachment { attachments })
    }

    // -----------------------------------------------------------------------
    // Signal nets
    // -----------------------------------------------------------------------

    fn stop_point(&self, stop: &Stop) -> GridPoint {
        match *stop {
            Stop::Strip(_, hole) => self.platform.grid_point(hole),
            Stop::Jumper(j) => self.platform.jumper_point(j),
        }
    }

    /// Lead position for a stop: the free strip hole nearest `toward`.
    fn endpoint(&mut self, net: &Net, stop: &Stop, toward: GridPoint) -> Result<(Endpoint, GridPoint), RoutingError> {
        match *stop {
            Stop::Strip(strip, pin) => {
                let hole = self
                    .free_hole(strip, |p| p.manhattan(toward))
                    .ok_or_else(|| full_strip(net, pin))?;
                self.used.insert(hole);
                Ok((Endpoint::Hole(hole), self.platform.grid_point(hole)))
            }
            Stop::Jumper(j) => Ok((Endpoint::Jumper(j), self.platform.jumper_point(j))),
        }
    }

    fn wire_signal(&mut self, net: &Net, pins: &[HoleRef]) -> Result<NetRoute, RoutingError> {
        let color = WireColor::from(net.role);
        let mut stops: Vec<Stop> = self
            .distinct_strips(pins)
            .into_iter()
            .map(|(strip, hole)| Stop::Strip(strip, hole))
            .collect();
        stops.extend(net.terminals.iter().filter_map(|t| match t {
            Terminal::Jumper(j) => Some(Stop::Jumper(*j)),
            Terminal::Rail(_) => None,
        }));
        stops.sort_by_key(|s| {
            let p = self.stop_point(s);
            (p.x, p.y)
        });

        if let [only] = stops.as_slice() {
            // Every pin sits on one strip: the strip itself is the connection.
            let (a, p) = match *only {
                Stop::Strip(_, hole) => (Endpoint::Hole(hole), self.platform.grid_point(hole)),
                Stop::Jumper(j) => (Endpoint::Jumper(j), self.platform.jumper_point(j)),
            };
            return Ok(NetRoute::Wired {
                wires: vec![self.commit_wire(a, a, color, vec![p])],
            });
        }

        let mut wires = Vec::with_capacity(stops.len().saturating_sub(1));
        for pair in stops.windows(2) {
            let target = self.stop_point(&pair[1]);
            let (a, pa) = self.endpoint(net, &pair[0], target)?;
            let (b, pb) = self.endpoint(net, &pair[1], pa)?;
            let path = self.find_path(net, pa, pb)?;
            wires.push(self.commit_wire(a, b, color, path));
        }
        Ok(NetRoute::Wired { wires })
    }

    fn find_path(&self, net: &Net, a: GridPoint, b: GridPoint) -> Result<Vec<GridPoint>, RoutingError> {
        if a == b {
            return Ok(vec![a]);
        }
        if a.x == b.x || a.y == b.y {
            return Ok(vec![a, b]);
        }

        let (l_path, l_crossings) = choose_l_route(a, b, &self.segments);
        if l_crossings <= self.config.l_route_crossing_threshold {
            return Ok(l_path);
        }

        trace!(net = %net.id, crossings = l_crossings, "both L-routes congested, searching grid");
        let grid = grid_search(a, b, self.platform.grid_bounds(), &self.cover, self.config).ok_or_else(|| {
            unroutable(
                net,
                format!("no path within a search budget of {} nodes", self.config.search_budget),
            )
        })?;
        let grid_crossings = crossings_against(&grid, &self.segments);
        if (grid_crossings, path_length(&grid)) < (l_crossings, path_length(&l_path)) {
            Ok(grid)
        } else {
            Ok(l_path)
        }
    }

    fn commit_wire(&mut self, a: Endpoint, b: Endpoint, color: WireColor, path: Vec<GridPoint>) -> Wire {
        let crossings = crossings_against(&path, &self.segments);
        self.segments.extend(segments_of(&path));
        for cell in cells_of(&path) {
            *self.cover.entry(cell).or_insert(0) += 1;
        }
        Wire {
            a,
            b,
            color,
            length: path_length(&path),
            path,
            crossings,
            board_crossing: a.board() != b.board(),
        }
    }
}

fn unroutable(net: &Net, reason: String) -> RoutingError {
    RoutingError::UnroutableNet {
        net: net.id.clone(),
        reason,
    }
}

fn full_strip(net: &Net, pin: HoleRef) -> RoutingError {
    unroutable(net, format!("no free hole for a lead on the strip of {pin}"))
}

/// Pick the L-route from `a` to `b` crossing fewer of `existing`.
///
/// Returns the path and its crossing count. Ties go to horizontal-first.
pub fn choose_l_route(a: GridPoint, b: GridPoint, existing: &[Segment]) -> (Vec<GridPoint>, usize) {
    let horizontal_first = vec![a, GridPoint::new(b.x, a.y), b];
    let vertical_first = vec![a, GridPoint::new(a.x, b.y), b];
    let h = crossings_against(&horizontal_first, existing);
    let v = crossings_against(&vertical_first, existing);
    if v < h {
        (vertical_first, v)
    } else {
        (horizontal_first, h)
    }
}

/// Every grid cell a path passes over.
fn cells_of(path: &[GridPoint]) -> Vec<GridPoint> {
    let mut cells = Vec::new();
    if let [only] = path {
        cells.push(*only);
    }
    for w in path.windows(2) {
        let (from, to) = (w[0], w[1]);
        let (dx, dy) = ((to.x - from.x).signum(), (to.y - from.y).signum());
        let mut p = from;
        cells.push(p);
        while p != to {
            p = GridPoint::new(p.x + dx, p.y + dy);
            cells.push(p);
        }
    }
    cells
}

const DIRECTIONS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
/// Direction index of the start state.
const NO_DIRECTION: u8 = 4;

/// Four-directional A* from `start` to `goal` inside `bounds`.
///
/// Stepping onto a cell costs `1 + wire_overlap_penalty * cover`, turning
/// adds `bend_penalty`. Returns `None` when more than `search_budget` nodes
/// would be expanded. Heap entries carry the coordinates, so equal-cost
/// frontiers pop in a fixed order.
pub fn grid_search(
    start: GridPoint,
    goal: GridPoint,
    bounds: (GridPoint, GridPoint),
    cover: &HashMap<GridPoint, u32>,
    config: &RoutingConfig,
) -> Option<Vec<GridPoint>> {
    type State = (GridPoint, u8);
    let (lo, hi) = bounds;
    let in_bounds = |p: GridPoint| p.x >= lo.x && p.x <= hi.x && p.y >= lo.y && p.y <= hi.y;
    if !in_bounds(start) || !in_bounds(goal) {
        return None;
    }

    let origin: State = (start, NO_DIRECTION);
    let mut best: HashMap<State, u32> = HashMap::from([(origin, 0)]);
    let mut parent: HashMap<State, State> = HashMap::new();
    let mut open = BinaryHeap::new();
    open.push(Reverse((start.manhattan(goal), 0u32, start.x, start.y, NO_DIRECTION)));
    let mut expanded = 0usize;

    while let Some(Reverse((_, g, x, y, dir))) = open.pop() {
        let here = GridPoint::new(x, y);
        let state: State = (here, dir);
        if best.get(&state).is_some_and(|&b| g > b) {
            continue;
        }
        if here == goal {
            let mut points = vec![here];
            let mut cur = state;
            while let Some(&prev) = parent.get(&cur) {
                points.push(prev.0);
                cur = prev;
            }
            points.reverse();
            return Some(simplify_path(&points));
        }
        expanded += 1;
        if expanded > config.search_budget {
            return None;
        }

        for (d, (dx, dy)) in DIRECTIONS.iter().enumerate() {
            let next = GridPoint::new(x + dx, y + dy);
            if !in_bounds(next) {
                continue;
            }
            let d = d as u8;
            let overlap = cover.get(&next).copied().unwrap_or(0);
            let mut step = 1u32.saturating_add(config.wire_overlap_penalty.saturating_mul(overlap));
            if dir != NO_DIRECTION && dir != d {
                step = step.saturating_add(config.bend_penalty);
            }
            let cost = g.saturating_add(step);
            let next_state: State = (next, d);
            if best.get(&next_state).map_or(true, |&b| cost < b) {
                best.insert(next_state, cost);
                parent.insert(next_state, state);
                open.push(Reverse((cost.saturating_add(next.manhattan(goal)), cost, next.x, next.y, d)));
            }
        }
    }
    None
}
