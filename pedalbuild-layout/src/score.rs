//! Layout scoring. Lower is better.
//!
//! ```text
//! score = crossings * W_cross
//!       + total_wire_length * W_len
//!       + (unplaced + unrouted) * W_penalty
//! ```
//!
//! Crossings are counted pairwise over every point-to-point wire; rail
//! attachments are straight drops and never count as crossings, but their
//! length is part of the total.

use crate::config::ScoreWeights;
use crate::geometry::path_crossings;
use crate::types::{LayoutResult, LayoutStats, NetRoute, RoutedNet, Wire};

/// Number of wire pairs crossing, counted once per intersection point.
pub fn count_crossings(wires: &[&Wire]) -> usize {
    let mut total = 0;
    for (i, a) in wires.iter().enumerate() {
        for b in &wires[i + 1..] {
            total += path_crossings(&a.path, &b.path);
        }
    }
    total
}

/// Aggregate statistics over a set of routes.
pub fn compute_stats(routes: &[RoutedNet], unplaced: usize, unrouted: usize) -> LayoutStats {
    let mut wires: Vec<&Wire> = Vec::new();
    let mut stats = LayoutStats {
        unplaced,
        unrouted,
        ..LayoutStats::default()
    };

    for routed in routes {
        match &routed.route {
            NetRoute::Wired { wires: ws } => wires.extend(ws.iter()),
            NetRoute::RailAttachment { attachments } => {
                stats.rail_attachments += attachments.len();
                stats.total_wire_length += attachments.iter().map(|a| a.length as u64).sum::<u64>();
            }
            NetRoute::Unroutable { .. } => {}
        }
    }

    stats.wire_count = wires.len();
    stats.board_crossings = wires.iter().filter(|w| w.board_crossing).count();
    stats.total_wire_length += wires.iter().map(|w| w.length as u64).sum::<u64>();
    stats.crossings_count = count_crossings(&wires);
    stats
}

pub fn weighted_score(stats: &LayoutStats, weights: &ScoreWeights) -> f64 {
    stats.crossings_count as f64 * weights.crossing
        + stats.total_wire_length as f64 * weights.wire_length
        + (stats.unplaced + stats.unrouted) as f64 * weights.penalty
}

/// Score a finished layout from its routes and failure lists.
pub fn score(result: &LayoutResult, weights: &ScoreWeights) -> f64 {
    let stats = compute_stats(&result.routes, result.unplaced.len(), result.unrouted.len());
    weighted_score(&stats, weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GridPoint;
    use crate::netlist::NetRole;
    use crate::platform::{Board, HoleRef, Polarity, RailRef, Section};
    use crate::types::{Attachment, Endpoint, WireColor};
    use approx::assert_relative_eq;

    fn wire(points: &[(i32, i32)]) -> Wire {
        let path: Vec<GridPoint> = points.iter().map(|&(x, y)| GridPoint::new(x, y)).collect();
        let hole = Endpoint::Hole(HoleRef::new(Board::One, 0, 1));
        Wire {
            a: hole,
            b: hole,
            color: WireColor::Blue,
            length: crate::geometry::path_length(&path),
            path,
            crossings: 0,
            board_crossing: false,
        }
    }

    fn routed(net: &str, route: NetRoute) -> RoutedNet {
        RoutedNet {
            net: net.into(),
            role: NetRole::Signal,
            route,
        }
    }

    fn cross_routes() -> Vec<RoutedNet> {
        vec![
            routed("a", NetRoute::Wired { wires: vec![wire(&[(0, 5), (10, 5)])] }),
            routed("b", NetRoute::Wired { wires: vec![wire(&[(5, 0), (5, 10)])] }),
            routed(
                "vcc",
                NetRoute::RailAttachment {
                    attachments: vec![Attachment {
                        from: Endpoint::Hole(HoleRef::new(Board::One, 0, 4)),
                        rail: RailRef {
                            board: Board::One,
                            side: Section::Top,
                            polarity: Polarity::Positive,
                        },
                        length: 2,
                    }],
                },
            ),
        ]
    }

    #[test]
    fn stats_count_crossings_and_lengths() {
        let stats = compute_stats(&cross_routes(), 0, 0);
        assert_eq!(stats.crossings_count, 1);
        assert_eq!(stats.wire_count, 2);
        assert_eq!(stats.rail_attachments, 1);
        assert_eq!(stats.total_wire_length, 22);
    }

    #[test]
    fn weighted_formula() {
        let stats = compute_stats(&cross_routes(), 1, 2);
        let w = ScoreWeights::default();
        assert_relative_eq!(weighted_score(&stats, &w), 10.0 + 22.0 + 3.0e6);
    }

    #[test]
    fn crossings_are_order_independent() {
        let routes = cross_routes();
        let mut reversed = routes.clone();
        reversed.reverse();
        assert_eq!(
            compute_stats(&routes, 0, 0).crossings_count,
            compute_stats(&reversed, 0, 0).crossings_count
        );
    }

    #[test]
    fn unroutable_nets_add_nothing_but_penalty() {
        let routes = vec![routed("x", NetRoute::Unroutable { reason: "no path".into() })];
        let stats = compute_stats(&routes, 0, 1);
        assert_eq!(stats.wire_count, 0);
        assert_relative_eq!(weighted_score(&stats, &ScoreWeights::default()), 1.0e6);
    }
}
