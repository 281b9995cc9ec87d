use crate::codec::DecodeMode;
use crate::net::NetWorld;
use crate::queue::SelectionPolicy;
use crate::scenario::{
    ConfigError, FlowProtocol, ScenarioSpec, build_two_node, schedule_scenario,
};
use crate::sim::{SimTime, Simulator};

#[test]
fn scenario_parses_minimal_json_with_defaults() {
    let spec = ScenarioSpec::from_json("{}").expect("parse scenario");
    assert!(spec.flows.is_empty());
    assert!(spec.pauses.is_empty());
    assert_eq!(spec.sender.data_rate_bps, 100_000_000_000);
    assert_eq!(spec.sender.queue_count, 8);
    assert_eq!(spec.sender.selection, SelectionPolicy::RoundRobin);
    assert_eq!(spec.receiver.decode_mode, DecodeMode::Brief);
    assert_eq!(spec.channel.delay_ns, 1_000);
    assert!(spec.take_down_at_ns.is_none());
}

#[test]
fn scenario_parses_flows_pauses_and_overrides() {
    let raw = r#"
    {
        "sender": { "data_rate_bps": 10000000000, "interframe_gap_ns": 96, "selection": "strict_priority" },
        "receiver": { "decode_mode": "full" },
        "channel": { "delay_ns": 1000000 },
        "flows": [
            { "queue": 3, "count": 4, "protocol": "udp", "gap_ns": 500 },
            { "queue": 5, "pkt_bytes": 64, "protocol": "nack" }
        ],
        "pauses": [ { "queue": 5, "pause_at_ns": 0, "resume_at_ns": 10000 } ],
        "take_down_at_ns": 50000
    }
    "#;
    let spec = ScenarioSpec::from_json(raw).expect("parse scenario");
    assert_eq!(spec.sender.data_rate_bps, 10_000_000_000);
    assert_eq!(spec.sender.interframe_gap_ns, 96);
    assert_eq!(spec.sender.selection, SelectionPolicy::StrictPriority);
    assert_eq!(spec.receiver.decode_mode, DecodeMode::Full);
    assert_eq!(spec.channel.delay_ns, 1_000_000);

    assert_eq!(spec.flows.len(), 2);
    assert_eq!(spec.flows[0].protocol, FlowProtocol::Udp);
    assert_eq!(spec.flows[0].pkt_bytes, 1500);
    assert_eq!(spec.flows[0].count, 4);
    assert_eq!(spec.flows[1].protocol, FlowProtocol::Nack);
    assert_eq!(spec.flows[1].count, 1);
    assert_eq!(spec.pauses[0].resume_at_ns, Some(10_000));
    assert_eq!(spec.take_down_at_ns, Some(50_000));
}

#[test]
fn scenario_validation_rejects_bad_values() {
    let cases = [
        r#"{ "flows": [ { "queue": 8 } ] }"#,
        r#"{ "flows": [ { "pkt_bytes": 0 } ] }"#,
        r#"{ "sender": { "data_rate_bps": 0 } }"#,
        r#"{ "receiver": { "queue_count": 0 } }"#,
        r#"{ "pauses": [ { "queue": 1, "pause_at_ns": 10, "resume_at_ns": 5 } ] }"#,
        r#"{ "pauses": [ { "queue": 1 }, { "queue": 1, "pause_at_ns": 10 } ] }"#,
    ];
    for raw in cases {
        let err = ScenarioSpec::from_json(raw).expect_err(raw);
        assert!(matches!(err, ConfigError::Invalid(_)), "{raw}: {err}");
    }

    let err = ScenarioSpec::from_json("{ not json").expect_err("bad json");
    assert!(matches!(err, ConfigError::Json(_)));

    let err = ScenarioSpec::load("/definitely/not/here.json").expect_err("missing file");
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("/definitely/not/here.json"));
}

#[test]
fn scenario_runs_flows_through_pause_and_resume() {
    let raw = r#"
    {
        "sender": { "data_rate_bps": 10000000000 },
        "receiver": { "data_rate_bps": 10000000000 },
        "channel": { "delay_ns": 1000 },
        "flows": [
            { "queue": 1, "count": 3, "protocol": "tcp" },
            { "queue": 5, "count": 2, "protocol": "ack", "pkt_bytes": 100 }
        ],
        "pauses": [ { "queue": 5, "pause_at_ns": 0, "resume_at_ns": 100000 } ]
    }
    "#;
    let spec = ScenarioSpec::from_json(raw).expect("parse scenario");
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let nodes = build_two_node(&mut world, &spec);
    schedule_scenario(&mut sim, &spec, &nodes);

    sim.run_until(SimTime(50_000), &mut world);
    assert_eq!(world.net.stats.delivered_pkts, 3, "only queue 1 drains while 5 is paused");
    assert_eq!(world.net.device(nodes.sender).queues().len(5), 2);

    sim.run(&mut world);
    assert_eq!(world.net.stats.delivered_pkts, 5);
    assert_eq!(world.net.stats.delivered_bytes, 3 * 1500 + 2 * 100);
}

#[test]
fn scenario_take_down_drops_backlog() {
    let raw = r#"
    {
        "flows": [ { "queue": 0, "count": 10, "start_ns": 10 } ],
        "pauses": [ { "queue": 0, "pause_at_ns": 0, "resume_at_ns": 5000 } ],
        "take_down_at_ns": 1000
    }
    "#;
    let spec = ScenarioSpec::from_json(raw).expect("parse scenario");
    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let nodes = build_two_node(&mut world, &spec);
    schedule_scenario(&mut sim, &spec, &nodes);
    sim.run(&mut world);

    let sender = world.net.device(nodes.sender);
    assert!(!sender.is_link_up());
    assert_eq!(sender.stats.dropped, 10);
    assert_eq!(world.net.stats.delivered_pkts, 0);
}
