//! Multi-seed search over placement and routing.
//!
//! ```text
//! INIT -> (PLACE -> ROUTE -> SCORE) x seeds -> SELECT_BEST -> DONE
//! ```
//!
//! Every seed of the schedule `base_seed + i` is an independent candidate
//! over shared read-only inputs, so candidates run in parallel on a rayon
//! pool and are joined before selection. The winner is the lowest
//! `(score, seed)` pair, which does not depend on completion order.
//!
//! With a time budget, a candidate gives up between stages once the deadline
//! has passed, but only if some other candidate already completed. The first
//! candidate therefore always finishes.

use crate::config::LayoutConfig;
use crate::error::{PlacementError, RoutingError};
use crate::groups::{BlockKind, FunctionalBlock};
use crate::netlist::{Footprint, Netlist};
use crate::placement::{place_components, PlacementOutcome};
use crate::platform::PlatformModel;
use crate::routing::{route_nets, RoutingOutcome};
use crate::score::{compute_stats, weighted_score};
use crate::types::{LayoutResult, PlacedComponent, UnplacedComponent, UnroutedNet};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Bookkeeping of one optimizer run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    pub started: usize,
    pub completed: usize,
    /// Seeds skipped or abandoned after the deadline.
    pub cancelled: usize,
    pub elapsed: Duration,
    pub best_seed: u64,
}

/// Drives candidates over one validated netlist.
pub struct Optimizer<'a> {
    platform: &'a PlatformModel,
    netlist: &'a Netlist,
    blocks: &'a [FunctionalBlock],
    config: &'a LayoutConfig,
    /// Block of each component, by index.
    block_of: Vec<BlockKind>,
}

/// Shared progress of one run.
struct Progress {
    deadline: Option<Instant>,
    started: AtomicUsize,
    completed: AtomicUsize,
}

impl Progress {
    fn should_stop(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d) && self.completed.load(Ordering::SeqCst) > 0
    }
}

impl<'a> Optimizer<'a> {
    pub fn new(
        platform: &'a PlatformModel,
        netlist: &'a Netlist,
        blocks: &'a [FunctionalBlock],
        config: &'a LayoutConfig,
    ) -> Self {
        let mut block_of = vec![BlockKind::Unassigned; netlist.components.len()];
        for block in blocks {
            for &c in &block.members {
                block_of[c.0] = block.kind;
            }
        }
        Self {
            platform,
            netlist,
            blocks,
            config,
            block_of,
        }
    }

    /// Run the whole seed schedule and keep the best candidate.
    pub fn run(&self) -> (LayoutResult, SearchStats) {
        let started_at = Instant::now();
        let opts = &self.config.optimizer;
        let seeds: Vec<u64> = opts.seeds().collect();
        let progress = Progress {
            deadline: opts.time_budget().map(|budget| started_at + budget),
            started: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        };

        info!(
            components = self.netlist.components.len(),
            nets = self.netlist.nets.len(),
            blocks = self.blocks.len(),
            iterations = seeds.len(),
            "starting layout search"
        );

        let evaluate = || -> Vec<LayoutResult> {
            seeds
                .par_iter()
                .filter_map(|&seed| self.evaluate(seed, &progress))
                .collect()
        };
        let candidates = match ThreadPoolBuilder::new().num_threads(opts.workers).build() {
            Ok(pool) => pool.install(evaluate),
            Err(err) => {
                warn!(error = %err, "could not build worker pool, using the global pool");
                evaluate()
            }
        };

        let best = candidates
            .into_iter()
            .min_by(|a, b| a.score.total_cmp(&b.score).then(a.seed.cmp(&b.seed)))
            .unwrap_or_else(|| self.candidate(opts.base_seed));

        let completed = progress.completed.load(Ordering::SeqCst);
        let stats = SearchStats {
            started: progress.started.load(Ordering::SeqCst),
            completed,
            cancelled: seeds.len().saturating_sub(completed),
            elapsed: started_at.elapsed(),
            best_seed: best.seed,
        };
        info!(
            seed = best.seed,
            score = best.score,
            unplaced = best.unplaced.len(),
            unrouted = best.unrouted.len(),
            completed = stats.completed,
            cancelled = stats.cancelled,
            "layout search finished"
        );
        (best, stats)
    }

    /// Build one candidate to completion, ignoring any time budget.
    pub fn candidate(&self, seed: u64) -> LayoutResult {
        let placement = self.place(seed);
        let routing = self.route(&placement);
        self.assemble(seed, &placement, routing)
    }

    fn evaluate(&self, seed: u64, progress: &Progress) -> Option<LayoutResult> {
        if progress.should_stop() {
            return None;
        }
        progress.started.fetch_add(1, Ordering::SeqCst);

        let placement = self.place(seed);
        if progress.should_stop() {
            debug!(seed, "candidate cancelled after placement");
            return None;
        }
        let routing = self.route(&placement);
        if progress.should_stop() {
            debug!(seed, "candidate cancelled after routing");
            return None;
        }

        let result = self.assemble(seed, &placement, routing);
        progress.completed.fetch_add(1, Ordering::SeqCst);
        debug!(seed, score = result.score, "candidate scored");
        Some(result)
    }

    fn place(&self, seed: u64) -> PlacementOutcome {
        place_components(self.platform, self.netlist, self.blocks, &self.config.placement, seed)
    }

    fn route(&self, placement: &PlacementOutcome) -> RoutingOutcome {
        route_nets(self.platform, self.netlist, placement, &self.config.routing)
    }

    fn assemble(&self, seed: u64, placement: &PlacementOutcome, routing: RoutingOutcome) -> LayoutResult {
        let placements = self
            .netlist
            .components
            .iter()
            .filter_map(|comp| {
                let p = placement.placement(comp.index)?;
                Some(PlacedComponent {
                    component: comp.id.clone(),
                    kind: comp.kind,
                    value: comp.value.clone(),
                    block: self.block_of[comp.index.0],
                    board: p.board,
                    section: p.section,
                    row: p.row,
                    column: p.column,
                    orientation: p.orientation,
                    pins: self.platform.pin_holes(comp, p),
                })
            })
            .collect();

        let unplaced: Vec<UnplacedComponent> = placement
            .failures
            .iter()
            .map(|(_, PlacementError::CapacityExceeded { component, reason })| UnplacedComponent {
                component: component.clone(),
                reason: reason.clone(),
            })
            .collect();
        let unrouted: Vec<UnroutedNet> = routing
            .failures
            .into_iter()
            .map(|(_, RoutingError::UnroutableNet { net, reason })| UnroutedNet { net, reason })
            .collect();
        let off_board = self
            .netlist
            .components
            .iter()
            .filter(|c| c.footprint == Footprint::OffBoard)
            .map(|c| c.id.clone())
            .collect();

        let stats = compute_stats(&routing.routes, unplaced.len(), unrouted.len());
        let score = weighted_score(&stats, &self.config.weights);

        LayoutResult {
            placements,
            routes: routing.routes,
            unplaced,
            unrouted,
            off_board,
            stats,
            score,
            seed,
        }
    }
}
