//! Signal-flow graph over the validated netlist.
//!
//! Components are nodes; two components are adjacent when they share a signal
//! or control net. Supply nets are ignored so that everything hanging off the
//! rails does not collapse into one layer. A breadth-first walk from the
//! input net gives each reachable component its signal-flow depth.

use crate::netlist::{ComponentId, NetId, NetRole, Netlist, Terminal};
use crate::platform::JumperPoint;
use std::collections::VecDeque;

/// Component/net incidence plus BFS depths from the input net.
#[derive(Debug, Clone)]
pub struct SignalGraph {
    /// Signal-carrying nets of each component.
    component_nets: Vec<Vec<NetId>>,
    /// Components on each net (any role).
    net_components: Vec<Vec<ComponentId>>,
    depths: Vec<Option<usize>>,
    max_depth: usize,
    input: Option<NetId>,
    output: Option<NetId>,
}

impl SignalGraph {
    pub fn build(netlist: &Netlist) -> Self {
        let mut component_nets = vec![Vec::new(); netlist.components.len()];
        let mut net_components = vec![Vec::new(); netlist.nets.len()];

        for net in &netlist.nets {
            for &(cid, _) in &net.pins {
                if !net_components[net.index.0].contains(&cid) {
                    net_components[net.index.0].push(cid);
                }
                let carries_signal = matches!(net.role, NetRole::Signal | NetRole::Control);
                if carries_signal && !component_nets[cid.0].contains(&net.index) {
                    component_nets[cid.0].push(net.index);
                }
            }
        }

        let input = netlist
            .input_net
            .or_else(|| jumper_net(netlist, JumperPoint::Input))
            .or_else(|| {
                netlist
                    .nets
                    .iter()
                    .find(|n| n.role == NetRole::Signal)
                    .map(|n| n.index)
            });
        let output = netlist
            .output_net
            .or_else(|| jumper_net(netlist, JumperPoint::Output));

        let mut graph = SignalGraph {
            component_nets,
            net_components,
            depths: vec![None; netlist.components.len()],
            max_depth: 0,
            input,
            output,
        };
        graph.walk_from_input();
        graph
    }

    fn walk_from_input(&mut self) {
        let Some(input) = self.input else {
            return;
        };
        let mut net_seen = vec![false; self.net_components.len()];
        let mut queue: VecDeque<(NetId, usize)> = VecDeque::new();
        net_seen[input.0] = true;
        queue.push_back((input, 0));

        while let Some((net, depth)) = queue.pop_front() {
            for &cid in &self.net_components[net.0] {
                if self.depths[cid.0].is_some() {
                    continue;
                }
                self.depths[cid.0] = Some(depth);
                self.max_depth = self.max_depth.max(depth);
                for &next in &self.component_nets[cid.0] {
                    if !net_seen[next.0] {
                        net_seen[next.0] = true;
                        queue.push_back((next, depth + 1));
                    }
                }
            }
        }
    }

    /// BFS layer of a component, `None` when unreachable from the input.
    pub fn depth(&self, component: ComponentId) -> Option<usize> {
        self.depths.get(component.0).copied().flatten()
    }

    /// Depth scaled to `0.0..=1.0`.
    pub fn normalized_depth(&self, component: ComponentId) -> Option<f64> {
        let d = self.depth(component)?;
        if self.max_depth == 0 {
            Some(0.0)
        } else {
            Some(d as f64 / self.max_depth as f64)
        }
    }

    pub fn output_net(&self) -> Option<NetId> {
        self.output
    }

    pub fn is_on_net(&self, component: ComponentId, net: NetId) -> bool {
        self.net_components
            .get(net.0)
            .is_some_and(|members| members.contains(&component))
    }
}

fn jumper_net(netlist: &Netlist, jumper: JumperPoint) -> Option<NetId> {
    netlist
        .nets
        .iter()
        .find(|n| n.terminals.contains(&Terminal::Jumper(jumper)))
        .map(|n| n.index)
}
