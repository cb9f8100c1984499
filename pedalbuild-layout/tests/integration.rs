//! Integration tests for the layout engine.
//!
//! Tests the full pipeline: NetlistDef → LayoutResult → JSON.

use pedalbuild_layout::geometry::{segments_of, GridPoint};
use pedalbuild_layout::netlist::{ComponentDef, ComponentId, ComponentInstance, ComponentKind, Connection, NetDef, NetNode};
use pedalbuild_layout::platform::{Board, HoleRef, JumperPoint, Placement, PlatformModel, Polarity, Section, GAP_TOP_ROW};
use pedalbuild_layout::routing::choose_l_route;
use pedalbuild_layout::score;
use pedalbuild_layout::types::{Endpoint, NetRoute, WireColor};
use pedalbuild_layout::{generate_layout, generate_layout_with_stats, to_json, LayoutConfig, LayoutError, LayoutResult, NetlistDef, NetlistError};
use std::collections::HashSet;

fn comp(id: &str, kind: ComponentKind, pins: usize, value: Option<&str>) -> ComponentDef {
    ComponentDef {
        id: id.into(),
        kind,
        value: value.map(Into::into),
        pin_count: pins,
        span: None,
        hint: None,
    }
}

fn net(id: &str, nodes: Vec<NetNode>) -> NetDef {
    NetDef { id: id.into(), nodes }
}

fn pin(component: &str, pin: usize) -> NetNode {
    NetNode::pin(component, pin)
}

fn quick_config() -> LayoutConfig {
    let mut config = LayoutConfig::default();
    config.optimizer.iterations = 4;
    config
}

/// Op-amp overdrive: input buffer cap, bias divider, clipping feedback loop
/// with a drive pot, passive tone, level pot, and an off-board footswitch.
fn overdrive() -> NetlistDef {
    NetlistDef {
        components: vec![
            comp("C1", ComponentKind::Capacitor, 2, Some("47n")),
            comp("R1", ComponentKind::Resistor, 2, Some("1M")),
            comp("IC1", ComponentKind::Ic, 8, Some("TL072")),
            comp("R3", ComponentKind::Resistor, 2, Some("4k7")),
            comp("C2", ComponentKind::Capacitor, 2, Some("47n")),
            comp("D1", ComponentKind::Diode, 2, Some("1N4148")),
            comp("D2", ComponentKind::Diode, 2, Some("1N4148")),
            comp("DRIVE", ComponentKind::Potentiometer, 3, Some("500kB")),
            comp("R4", ComponentKind::Resistor, 2, Some("1k")),
            comp("C3", ComponentKind::Capacitor, 2, Some("220n")),
            comp("TONE", ComponentKind::Potentiometer, 3, Some("20kB")),
            comp("C4", ComponentKind::Capacitor, 2, Some("1u")),
            comp("LEVEL", ComponentKind::Potentiometer, 3, Some("100kA")),
            comp("R5", ComponentKind::Resistor, 2, Some("10k")),
            comp("R6", ComponentKind::Resistor, 2, Some("10k")),
            comp("C5", ComponentKind::Capacitor, 2, Some("10u")),
            comp("FOOT", ComponentKind::Hardware, 0, Some("3PDT")),
        ],
        nets: vec![
            net("in", vec![NetNode::Jumper(JumperPoint::Input), pin("C1", 1)]),
            net("n1", vec![pin("C1", 2), pin("R1", 1), pin("IC1", 3)]),
            net("vref", vec![pin("R1", 2), pin("R5", 2), pin("R6", 1), pin("C5", 1)]),
            net("vcc", vec![pin("IC1", 8), pin("R5", 1), NetNode::Rail(Polarity::Positive)]),
            net(
                "gnd",
                vec![
                    pin("IC1", 4),
                    pin("R6", 2),
                    pin("C5", 2),
                    pin("C2", 2),
                    pin("C3", 2),
                    pin("TONE", 3),
                    pin("LEVEL", 3),
                    NetNode::Jumper(JumperPoint::Gnd),
                ],
            ),
            net("fb", vec![pin("IC1", 2), pin("R3", 1), pin("DRIVE", 1), pin("D1", 1), pin("D2", 2), pin("C2", 1)]),
            net("o1", vec![pin("IC1", 1), pin("R3", 2), pin("DRIVE", 2), pin("D1", 2), pin("D2", 1), pin("R4", 1)]),
            net("t1", vec![pin("R4", 2), pin("C3", 1), pin("TONE", 1)]),
            net("t2", vec![pin("TONE", 2), pin("C4", 1)]),
            net("lv", vec![pin("C4", 2), pin("LEVEL", 1)]),
            net("out", vec![pin("LEVEL", 2), NetNode::Jumper(JumperPoint::Output)]),
        ],
        input_net: Some("in".into()),
        output_net: Some("out".into()),
    }
}

/// Rebuild the holes each placed component covers.
fn occupied(def: &NetlistDef, result: &LayoutResult) -> Vec<HashSet<HoleRef>> {
    let platform = PlatformModel::default();
    result
        .placements
        .iter()
        .map(|pc| {
            let (i, cdef) = def
                .components
                .iter()
                .enumerate()
                .find(|(_, c)| c.id == pc.component)
                .unwrap();
            let instance = ComponentInstance::from_def(ComponentId(i), cdef);
            let placement = Placement {
                component: ComponentId(i),
                board: pc.board,
                section: pc.section,
                row: pc.row,
                column: pc.column,
                orientation: pc.orientation,
            };
            platform.occupied_holes(&instance, &placement).into_iter().collect()
        })
        .collect()
}

// ─── Full pipeline tests ────────────────────────────────────────────────────

#[test]
fn overdrive_produces_complete_layout() {
    let def = overdrive();
    let result = generate_layout(&def, &quick_config()).unwrap();

    assert!(result.is_complete(), "unplaced: {:?}, unrouted: {:?}", result.unplaced, result.unrouted);
    assert_eq!(result.placements.len(), def.components.len() - 1);
    assert_eq!(result.off_board, vec!["FOOT".to_string()]);
    assert_eq!(result.stats.unplaced, 0);
    assert_eq!(result.stats.unrouted, 0);
}

#[test]
fn complete_layout_has_one_route_per_net() {
    let def = overdrive();
    let result = generate_layout(&def, &quick_config()).unwrap();
    assert!(result.is_complete());

    assert_eq!(result.routes.len(), def.nets.len());
    for (route, net) in result.routes.iter().zip(&def.nets) {
        assert_eq!(route.net, net.id);
        assert!(!matches!(route.route, NetRoute::Unroutable { .. }));
    }
}

#[test]
fn placements_never_overlap() {
    let def = overdrive();
    let result = generate_layout(&def, &quick_config()).unwrap();
    let sets = occupied(&def, &result);

    let mut seen = HashSet::new();
    for (pc, holes) in result.placements.iter().zip(&sets) {
        assert!(!holes.is_empty(), "{} sits on an illegal position", pc.component);
        for h in holes {
            assert!(seen.insert(*h), "hole {h} is used by two components");
        }
    }
}

#[test]
fn dip_straddles_the_gap() {
    let result = generate_layout(&overdrive(), &quick_config()).unwrap();
    let ic = result.placements.iter().find(|p| p.component == "IC1").unwrap();
    assert_eq!(ic.row, GAP_TOP_ROW);
    assert_eq!(ic.section, Section::Top);
    assert_eq!(ic.pins.len(), 8);
    assert_eq!(ic.pins[0].section(), Some(Section::Bottom));
    assert_eq!(ic.pins[7].section(), Some(Section::Top));
    assert_eq!(ic.value.as_deref(), Some("TL072"));
}

#[test]
fn pots_follow_signal_order() {
    let result = generate_layout(&overdrive(), &quick_config()).unwrap();
    let platform = PlatformModel::default();
    let slot = |id: &str| {
        let p = result.placements.iter().find(|p| p.component == id).unwrap();
        platform.pot_slot_at(p.board, p.row, p.column).unwrap().index
    };
    assert!(slot("DRIVE") < slot("TONE"));
    assert!(slot("TONE") < slot("LEVEL"));
}

#[test]
fn wire_endpoints_exist_on_platform() {
    let result = generate_layout(&overdrive(), &quick_config()).unwrap();
    let platform = PlatformModel::default();
    for wire in result.wires() {
        for end in [wire.a, wire.b] {
            let expected = match end {
                Endpoint::Hole(h) => {
                    assert!(platform.contains(h));
                    platform.grid_point(h)
                }
                Endpoint::Jumper(j) => platform.jumper_point(j),
                Endpoint::Rail(_) => continue,
            };
            assert!(
                wire.path.first() == Some(&expected) || wire.path.last() == Some(&expected),
                "wire path does not start or end at {end:?}"
            );
        }
        assert!(segments_of(&wire.path).all(|s| s.a.x == s.b.x || s.a.y == s.b.y));
    }
    for att in result.attachments() {
        if let Endpoint::Hole(h) = att.from {
            assert!(platform.contains(h));
        }
    }
}

// ─── Scenario tests ─────────────────────────────────────────────────────────

#[test]
fn netless_parts_all_fit_in_one_section() {
    let def = NetlistDef {
        components: (1..=10)
            .map(|i| comp(&format!("R{i}"), ComponentKind::Resistor, 2, None))
            .collect(),
        ..Default::default()
    };
    let result = generate_layout(&def, &quick_config()).unwrap();
    assert!(result.unplaced.is_empty());
    assert_eq!(result.placements.len(), 10);

    let mut seen = HashSet::new();
    for holes in occupied(&def, &result) {
        for h in holes {
            assert!(seen.insert(h));
        }
    }
}

#[test]
fn vcc_pin_becomes_rail_attachment() {
    let def = NetlistDef {
        components: vec![comp("IC1", ComponentKind::Ic, 8, None)],
        nets: vec![net("vcc", vec![pin("IC1", 8), NetNode::Jumper(JumperPoint::V9)])],
        ..Default::default()
    };
    let result = generate_layout(&def, &quick_config()).unwrap();
    let route = &result.routes[0];
    let NetRoute::RailAttachment { attachments } = &route.route else {
        panic!("expected a rail attachment, got {:?}", route.route);
    };
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].rail.polarity, Polarity::Positive);
    assert_eq!(result.stats.wire_count, 0);
    assert_eq!(result.stats.rail_attachments, 1);
}

#[test]
fn router_prefers_lower_crossing_l_route() {
    // Net A is already wired horizontal-first from (0,2) to (10,10).
    let a_path = vec![GridPoint::new(0, 2), GridPoint::new(10, 2), GridPoint::new(10, 10)];
    let existing: Vec<_> = segments_of(&a_path).collect();

    let naive_b = vec![GridPoint::new(12, 6), GridPoint::new(4, 6), GridPoint::new(4, 12)];
    let naive = pedalbuild_layout::geometry::path_crossings(&a_path, &naive_b);

    let (b_path, _) = choose_l_route(GridPoint::new(12, 6), GridPoint::new(4, 12), &existing);
    let chosen = pedalbuild_layout::geometry::path_crossings(&a_path, &b_path);
    assert!(chosen < naive);
}

#[test]
fn oversized_component_is_capacity_exceeded() {
    let mut def = overdrive();
    def.components.push(comp("HUGE", ComponentKind::Ic, 140, None));
    let result = generate_layout(&def, &quick_config()).unwrap();

    assert_eq!(result.unplaced.len(), 1);
    assert_eq!(result.unplaced[0].component, "HUGE");
    assert_eq!(result.placements.len(), def.components.len() - 2);
    assert!(result.unrouted.is_empty());
    assert!(result.score >= LayoutConfig::default().weights.penalty);
}

#[test]
fn same_seeds_give_identical_results() {
    let config = quick_config();
    let a = generate_layout(&overdrive(), &config).unwrap();
    let b = generate_layout(&overdrive(), &config).unwrap();
    assert_eq!(a.score.to_bits(), b.score.to_bits());
    assert_eq!(a.seed, b.seed);
    assert_eq!(to_json(&a), to_json(&b));
}

#[test]
fn crossing_count_is_idempotent() {
    let config = quick_config();
    let result = generate_layout(&overdrive(), &config).unwrap();
    let first = score::compute_stats(&result.routes, result.unplaced.len(), result.unrouted.len());
    let second = score::compute_stats(&result.routes, result.unplaced.len(), result.unrouted.len());
    assert_eq!(first, second);
    assert_eq!(first, result.stats);
    assert_eq!(score::score(&result, &config.weights).to_bits(), result.score.to_bits());
}

#[test]
fn search_stats_track_candidates() {
    let mut config = quick_config();
    config.optimizer.base_seed = 100;
    let (result, stats) = generate_layout_with_stats(&overdrive(), &config).unwrap();
    assert_eq!(stats.completed, 4);
    assert_eq!(stats.best_seed, result.seed);
    assert!((100..104).contains(&result.seed));
}

#[test]
fn wired_hardware_stays_off_board_without_penalty() {
    let def = NetlistDef {
        components: vec![
            comp("R1", ComponentKind::Resistor, 2, Some("10k")),
            comp("R2", ComponentKind::Resistor, 2, Some("10k")),
            comp("DC", ComponentKind::Hardware, 2, Some("2.1mm jack")),
            comp("FOOT", ComponentKind::Hardware, 3, Some("3PDT")),
        ],
        nets: vec![
            net("vcc", vec![pin("R1", 1), pin("DC", 1), NetNode::Rail(Polarity::Positive)]),
            net("gnd", vec![pin("R2", 2), pin("DC", 2), NetNode::Jumper(JumperPoint::Gnd)]),
            net("sig", vec![pin("R1", 2), pin("R2", 1), pin("FOOT", 2)]),
        ],
        ..Default::default()
    };
    let result = generate_layout(&def, &quick_config()).unwrap();

    assert!(result.is_complete(), "unplaced: {:?}, unrouted: {:?}", result.unplaced, result.unrouted);
    assert_eq!(result.off_board, vec!["DC".to_string(), "FOOT".to_string()]);
    assert_eq!(result.placements.len(), 2);
    assert!(result.score < LayoutConfig::default().weights.penalty);
    assert_eq!(result.stats.rail_attachments, 2);
    assert_eq!(result.stats.wire_count, 1);
}

// ─── Error handling tests ───────────────────────────────────────────────────

#[test]
fn dangling_pin_is_fatal() {
    let mut def = overdrive();
    def.nets.push(net("bad", vec![pin("R4", 5), pin("C3", 2)]));
    let err = generate_layout(&def, &quick_config()).unwrap_err();
    assert!(matches!(
        err,
        LayoutError::InvalidNetlist(NetlistError::PinOutOfRange { .. })
    ));
}

#[test]
fn unknown_component_is_fatal() {
    let mut def = overdrive();
    def.nets.push(net("ghost", vec![pin("Q9", 1), pin("R4", 1)]));
    let err = generate_layout(&def, &quick_config()).unwrap_err();
    assert!(matches!(
        err,
        LayoutError::InvalidNetlist(NetlistError::UnknownComponent { .. })
    ));
}

#[test]
fn invalid_config_is_fatal() {
    let mut config = quick_config();
    config.optimizer.iterations = 0;
    assert!(matches!(
        generate_layout(&overdrive(), &config),
        Err(LayoutError::Config(_))
    ));
}

#[test]
fn empty_netlist_gives_empty_layout() {
    let result = generate_layout(&NetlistDef::default(), &quick_config()).unwrap();
    assert!(result.placements.is_empty());
    assert!(result.routes.is_empty());
    assert_eq!(result.score, 0.0);
}

// ─── Input boundary tests ───────────────────────────────────────────────────

#[test]
fn pairwise_connections_build_a_layout() {
    let components = vec![
        comp("C1", ComponentKind::Capacitor, 2, None),
        comp("R1", ComponentKind::Resistor, 2, None),
        comp("Q1", ComponentKind::Transistor, 3, Some("2N3904")),
    ];
    let connections = vec![
        Connection { from: NetNode::Jumper(JumperPoint::Input), to: pin("C1", 1) },
        Connection { from: pin("C1", 2), to: pin("Q1", 2) },
        Connection { from: pin("R1", 1), to: pin("Q1", 2) },
        Connection { from: pin("R1", 2), to: NetNode::Rail(Polarity::Positive) },
        Connection { from: pin("Q1", 3), to: NetNode::Jumper(JumperPoint::Gnd) },
        Connection { from: pin("Q1", 1), to: NetNode::Jumper(JumperPoint::Output) },
    ];
    let def = NetlistDef::from_connections(components, &connections);
    assert_eq!(def.nets.len(), 5);

    let result = generate_layout(&def, &quick_config()).unwrap();
    assert!(result.is_complete());
    let colors: HashSet<WireColor> = result.wires().map(|w| w.color).collect();
    assert_eq!(colors, HashSet::from([WireColor::Blue]));
}

#[test]
fn json_netlist_and_yaml_config() {
    let json = r#"{
        "components": [
            {"id": "C1", "kind": "capacitor", "pin_count": 2, "value": "100n"},
            {"id": "R1", "kind": "resistor", "pin_count": 2, "value": "10k"}
        ],
        "nets": [
            {"id": "in", "nodes": [{"jumper": "INPUT"}, {"pin": {"component": "C1", "pin": 1}}]},
            {"id": "mid", "nodes": [{"pin": {"component": "C1", "pin": 2}}, {"pin": {"component": "R1", "pin": 1}}]},
            {"id": "gnd", "nodes": [{"pin": {"component": "R1", "pin": 2}}, {"jumper": "GND"}]}
        ],
        "input_net": "in"
    }"#;
    let def = NetlistDef::from_json(json).unwrap();
    let config = LayoutConfig::from_yaml_str("optimizer:\n  iterations: 2\n  workers: 1\n").unwrap();
    let result = generate_layout(&def, &config).unwrap();
    assert!(result.is_complete());
    assert_eq!(result.stats.rail_attachments, 1);
}

// ─── JSON output tests ──────────────────────────────────────────────────────

#[test]
fn json_output_has_expected_fields() {
    let result = generate_layout(&overdrive(), &quick_config()).unwrap();
    let json = to_json(&result);
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    for key in ["placements", "routes", "unplaced", "unrouted", "off_board", "stats", "score", "seed"] {
        assert!(value.get(key).is_some(), "missing `{key}`");
    }
    let stats = &value["stats"];
    for key in ["crossings_count", "total_wire_length", "unplaced", "unrouted"] {
        assert!(stats.get(key).is_some(), "missing stats `{key}`");
    }

    let vcc = value["routes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["net"] == "vcc")
        .unwrap();
    assert_eq!(vcc["route"]["type"], "rail_attachment");
    assert_eq!(vcc["role"], "power");

    let placed = &value["placements"][0];
    for key in ["board", "section", "row", "column", "orientation"] {
        assert!(placed.get(key).is_some(), "missing placement `{key}`");
    }
}

#[test]
fn json_round_trips() {
    let result = generate_layout(&overdrive(), &quick_config()).unwrap();
    let back: LayoutResult = serde_json::from_str(&to_json(&result)).unwrap();
    assert_eq!(back, result);
    assert_eq!(back.placements[0].board, Board::One);
}
