//! Netlist and bill of materials.
//!
//! [`NetlistDef`] is the serde-facing input handed over by schematic
//! analysis. [`Netlist::new`] validates it and resolves it into an arena of
//! [`ComponentInstance`]s and [`Net`]s indexed by [`ComponentId`] / [`NetId`].
//! Validation failures are fatal and surface before any placement attempt.

use crate::error::NetlistError;
use crate::groups::BlockKind;
use crate::platform::{JumperPoint, Polarity, PowerRailConfig};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NetId(pub usize);

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// Electronic component types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Resistor,
    Capacitor,
    Ic,
    Transistor,
    Diode,
    Potentiometer,
    Switch,
    Led,
    Jack,
    Hardware,
    Other,
}

impl ComponentKind {
    /// Default lead span in holes when the BOM does not declare one.
    fn default_span(self, pin_count: usize) -> usize {
        match self {
            ComponentKind::Resistor | ComponentKind::Diode => 4,
            ComponentKind::Capacitor => 3,
            ComponentKind::Led => 2,
            ComponentKind::Transistor => 3,
            ComponentKind::Ic | ComponentKind::Potentiometer => pin_count,
            _ => pin_count.max(2),
        }
    }
}

/// How a component sits on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Footprint {
    /// Two leads at the ends of the span.
    TwoLead,
    /// Dual in-line package straddling the gap.
    Dip,
    /// Pins spread along one row.
    Inline,
    /// Potentiometer in a dedicated slot.
    Pot,
    /// Not inserted into the board (enclosure hardware).
    OffBoard,
}

impl Footprint {
    fn classify(kind: ComponentKind, pin_count: usize) -> Footprint {
        match (kind, pin_count) {
            (_, 0) => Footprint::OffBoard,
            (ComponentKind::Hardware, _) => Footprint::OffBoard,
            (ComponentKind::Potentiometer, 1..=3) => Footprint::Pot,
            (ComponentKind::Ic, n) if n % 2 == 0 => Footprint::Dip,
            (ComponentKind::Potentiometer | ComponentKind::Ic, _) => Footprint::Inline,
            (_, 2) => Footprint::TwoLead,
            _ => Footprint::Inline,
        }
    }
}

/// A BOM entry as delivered by schematic analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDef {
    /// Reference designator, e.g. `"R1"`, `"IC1"`.
    pub id: String,
    pub kind: ComponentKind,
    #[serde(default)]
    pub value: Option<String>,
    pub pin_count: usize,
    /// Lead span in holes; defaults by kind.
    #[serde(default)]
    pub span: Option<usize>,
    /// Functional block suggested by schematic analysis.
    #[serde(default)]
    pub hint: Option<BlockKind>,
}

/// A validated component instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInstance {
    pub index: ComponentId,
    pub id: String,
    pub kind: ComponentKind,
    pub value: Option<String>,
    pub pin_count: usize,
    pub span: usize,
    pub footprint: Footprint,
    pub hint: Option<BlockKind>,
}

impl ComponentInstance {
    pub fn from_def(index: ComponentId, def: &ComponentDef) -> Self {
        let footprint = Footprint::classify(def.kind, def.pin_count);
        let span = match footprint {
            Footprint::Dip => def.pin_count / 2,
            Footprint::Pot => def.pin_count,
            _ => def.span.unwrap_or_else(|| def.kind.default_span(def.pin_count)),
        };
        Self {
            index,
            id: def.id.clone(),
            kind: def.kind,
            value: def.value.clone(),
            pin_count: def.pin_count,
            span,
            footprint,
            hint: def.hint,
        }
    }

    /// Rough board area, used to pick block anchors.
    pub fn size(&self) -> usize {
        match self.footprint {
            Footprint::Dip => self.pin_count,
            Footprint::OffBoard => 0,
            _ => self.span.max(self.pin_count),
        }
    }
}

// ---------------------------------------------------------------------------
// Nets
// ---------------------------------------------------------------------------

/// One pin of one component (pins are numbered from 1).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinRef {
    pub component: String,
    pub pin: usize,
}

/// A connection point of a net.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetNode {
    Pin(PinRef),
    Rail(Polarity),
    Jumper(JumperPoint),
}

impl NetNode {
    pub fn pin(component: impl Into<String>, pin: usize) -> Self {
        NetNode::Pin(PinRef {
            component: component.into(),
            pin,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetDef {
    pub id: String,
    pub nodes: Vec<NetNode>,
}

/// A single pin-to-pin connection from schematic analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub from: NetNode,
    pub to: NetNode,
}

/// Electrical role of a net; decides rail attachment and wire color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetRole {
    Power,
    Ground,
    Signal,
    Control,
}

impl NetRole {
    pub fn rail_polarity(self) -> Option<Polarity> {
        match self {
            NetRole::Power => Some(Polarity::Positive),
            NetRole::Ground => Some(Polarity::Negative),
            _ => None,
        }
    }
}

/// Platform-side terminal of a net.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    Rail(Polarity),
    Jumper(JumperPoint),
}

/// A validated net.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Net {
    pub index: NetId,
    pub id: String,
    /// `(component, pin)` pairs in input order, deduplicated.
    pub pins: Vec<(ComponentId, usize)>,
    pub terminals: Vec<Terminal>,
    pub role: NetRole,
}

impl Net {
    pub fn is_supply(&self) -> bool {
        self.role.rail_polarity().is_some()
    }
}

// ---------------------------------------------------------------------------
// Netlist input
// ---------------------------------------------------------------------------

/// The serde-facing netlist + BOM.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetlistDef {
    pub components: Vec<ComponentDef>,
    #[serde(default)]
    pub nets: Vec<NetDef>,
    /// Net carrying the signal into the circuit.
    #[serde(default)]
    pub input_net: Option<String>,
    /// Net carrying the signal out of the circuit.
    #[serde(default)]
    pub output_net: Option<String>,
}

impl NetlistDef {
    pub fn from_json(json: &str) -> Result<Self, NetlistError> {
        serde_json::from_str(json).map_err(|e| NetlistError::Parse(e.to_string()))
    }

    /// Build a netlist from pairwise schematic connections.
    ///
    /// Connections that share a node are merged into one net. Nets touching
    /// the `INPUT` / `OUTPUT` jumpers become the declared signal nets.
    pub fn from_connections(components: Vec<ComponentDef>, connections: &[Connection]) -> Self {
        let mut groups: Vec<Vec<NetNode>> = Vec::new();

        for conn in connections {
            let nodes = [conn.from.clone(), conn.to.clone()];

            let mut merge: Vec<usize> = groups
                .iter()
                .enumerate()
                .filter(|(_, g)| nodes.iter().any(|n| g.contains(n)))
                .map(|(i, _)| i)
                .collect();

            if merge.is_empty() {
                let mut group = vec![nodes[0].clone()];
                if nodes[1] != nodes[0] {
                    group.push(nodes[1].clone());
                }
                groups.push(group);
                continue;
            }

            merge.sort_unstable();
            let target = merge[0];
            for &idx in merge.iter().skip(1).rev() {
                let g = groups.remove(idx);
                for n in g {
                    if !groups[target].contains(&n) {
                        groups[target].push(n);
                    }
                }
            }
            for n in nodes {
                if !groups[target].contains(&n) {
                    groups[target].push(n);
                }
            }
        }

        let nets: Vec<NetDef> = groups
            .into_iter()
            .enumerate()
            .map(|(i, nodes)| {
                let id = nodes
                    .iter()
                    .find_map(|n| match n {
                        NetNode::Jumper(j) => Some(j.name().to_string()),
                        _ => None,
                    })
                    .unwrap_or_else(|| format!("net_{i}"));
                NetDef { id, nodes }
            })
            .collect();

        let find = |jumper: JumperPoint| {
            nets.iter()
                .find(|n| n.nodes.contains(&NetNode::Jumper(jumper)))
                .map(|n| n.id.clone())
        };
        let input_net = find(JumperPoint::Input);
        let output_net = find(JumperPoint::Output);

        NetlistDef {
            components,
            nets,
            input_net,
            output_net,
        }
    }
}

// ---------------------------------------------------------------------------
// Validated netlist
// ---------------------------------------------------------------------------

/// Arena of components and nets. Immutable once built.
#[derive(Debug, Clone)]
pub struct Netlist {
    pub components: Vec<ComponentInstance>,
    pub nets: Vec<Net>,
    pub input_net: Option<NetId>,
    pub output_net: Option<NetId>,
    by_id: HashMap<String, ComponentId>,
    pin_net: HashMap<(ComponentId, usize), NetId>,
}

impl Netlist {
    /// Parse and validate a JSON netlist.
    pub fn from_json(json: &str, power: &PowerRailConfig) -> Result<Self, NetlistError> {
        Self::new(&NetlistDef::from_json(json)?, power)
    }

    /// Validate a netlist given as pairwise connections.
    pub fn from_connections(
        components: Vec<ComponentDef>,
        connections: &[Connection],
        power: &PowerRailConfig,
    ) -> Result<Self, NetlistError> {
        Self::new(&NetlistDef::from_connections(components, connections), power)
    }

    /// Validate and resolve a netlist definition.
    pub fn new(def: &NetlistDef, power: &PowerRailConfig) -> Result<Self, NetlistError> {
        let mut by_id = HashMap::new();
        let mut components = Vec::with_capacity(def.components.len());
        for (i, c) in def.components.iter().enumerate() {
            if by_id.insert(c.id.clone(), ComponentId(i)).is_some() {
                return Err(NetlistError::DuplicateComponent(c.id.clone()));
            }
            components.push(ComponentInstance::from_def(ComponentId(i), c));
        }

        let mut seen_nets = HashSet::new();
        let mut pin_net = HashMap::new();
        let mut nets = Vec::with_capacity(def.nets.len());

        for (i, nd) in def.nets.iter().enumerate() {
            if !seen_nets.insert(nd.id.as_str()) {
                return Err(NetlistError::DuplicateNet(nd.id.clone()));
            }
            let index = NetId(i);
            let mut pins: Vec<(ComponentId, usize)> = Vec::new();
            let mut terminals: Vec<Terminal> = Vec::new();

            for node in &nd.nodes {
                match node {
                    NetNode::Pin(p) => {
                        let cid = *by_id.get(&p.component).ok_or_else(|| NetlistError::UnknownComponent {
                            net: nd.id.clone(),
                            component: p.component.clone(),
                        })?;
                        let pin_count = components[cid.0].pin_count;
                        if p.pin == 0 || p.pin > pin_count {
                            return Err(NetlistError::PinOutOfRange {
                                net: nd.id.clone(),
                                component: p.component.clone(),
                                pin: p.pin,
                                pin_count,
                            });
                        }
                        if pins.contains(&(cid, p.pin)) {
                            continue;
                        }
                        if pin_net.insert((cid, p.pin), index).is_some() {
                            return Err(NetlistError::PinInMultipleNets {
                                component: p.component.clone(),
                                pin: p.pin,
                            });
                        }
                        pins.push((cid, p.pin));
                    }
                    NetNode::Rail(polarity) => {
                        let t = Terminal::Rail(*polarity);
                        if !terminals.contains(&t) {
                            terminals.push(t);
                        }
                    }
                    NetNode::Jumper(j) => {
                        let t = Terminal::Jumper(*j);
                        if !terminals.contains(&t) {
                            terminals.push(t);
                        }
                    }
                }
            }

            if pins.len() + terminals.len() < 2 {
                return Err(NetlistError::NetTooSmall { net: nd.id.clone() });
            }

            let role = infer_role(&nd.id, &pins, &terminals, &components, power)?;
            nets.push(Net {
                index,
                id: nd.id.clone(),
                pins,
                terminals,
                role,
            });
        }

        let resolve = |name: &Option<String>| -> Result<Option<NetId>, NetlistError> {
            match name {
                None => Ok(None),
                Some(n) => nets
                    .iter()
                    .find(|net| net.id == *n)
                    .map(|net| Some(net.index))
                    .ok_or_else(|| NetlistError::UnknownSignalNet { net: n.clone() }),
            }
        };
        let input_net = resolve(&def.input_net)?;
        let output_net = resolve(&def.output_net)?;

        Ok(Netlist {
            components,
            nets,
            input_net,
            output_net,
            by_id,
            pin_net,
        })
    }

    pub fn component(&self, id: ComponentId) -> &ComponentInstance {
        &self.components[id.0]
    }

    pub fn net(&self, id: NetId) -> &Net {
        &self.nets[id.0]
    }

    pub fn component_by_name(&self, name: &str) -> Option<&ComponentInstance> {
        self.by_id.get(name).map(|&id| self.component(id))
    }

    pub fn net_by_name(&self, name: &str) -> Option<&Net> {
        self.nets.iter().find(|n| n.id == name)
    }

    pub fn net_of_pin(&self, component: ComponentId, pin: usize) -> Option<NetId> {
        self.pin_net.get(&(component, pin)).copied()
    }

    /// Nets touching a component, in pin order, without repeats.
    pub fn nets_of(&self, component: ComponentId) -> Vec<NetId> {
        let mut out = Vec::new();
        for pin in 1..=self.component(component).pin_count {
            if let Some(n) = self.net_of_pin(component, pin) {
                if !out.contains(&n) {
                    out.push(n);
                }
            }
        }
        out
    }

    /// Does any pin of this component sit on a power or ground net?
    pub fn is_supply_connected(&self, component: ComponentId) -> bool {
        self.nets_of(component).iter().any(|&n| self.net(n).is_supply())
    }
}

fn infer_role(
    net: &str,
    pins: &[(ComponentId, usize)],
    terminals: &[Terminal],
    components: &[ComponentInstance],
    power: &PowerRailConfig,
) -> Result<NetRole, NetlistError> {
    let polarity_of = |t: &Terminal| match t {
        Terminal::Rail(p) => Some(*p),
        Terminal::Jumper(j) => power.rail_polarity(*j),
    };
    let positive = terminals.iter().any(|t| polarity_of(t) == Some(Polarity::Positive));
    let negative = terminals.iter().any(|t| polarity_of(t) == Some(Polarity::Negative));

    match (positive, negative) {
        (true, true) => Err(NetlistError::ConflictingSupply { net: net.to_string() }),
        (true, false) => Ok(NetRole::Power),
        (false, true) => Ok(NetRole::Ground),
        (false, false) => {
            let touches_control = pins.iter().any(|(c, _)| {
                matches!(
                    components[c.0].kind,
                    ComponentKind::Potentiometer | ComponentKind::Switch
                )
            });
            Ok(if touches_control { NetRole::Control } else { NetRole::Signal })
        }
    }
}

impl fmt::Display for PinRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component, self.pin)
    }
}
