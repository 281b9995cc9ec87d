//! 两节点 PFC 仿真
//!
//! sender -> channel -> receiver；可从 JSON 场景加载流量与暂停/恢复事件，
//! 命令行参数覆盖场景中的线速、时延和帧间隔。

use clap::Parser;
use pfcsim_rs::net::NetWorld;
use pfcsim_rs::scenario::{FlowSpec, ScenarioSpec, build_two_node, schedule_scenario};
use pfcsim_rs::sim::{SimTime, Simulator};
use pfcsim_rs::trace::TraceLogger;
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "two-node", about = "两节点 PFC 仿真：sender -> receiver 多优先级队列发包")]
struct Args {
    /// 场景 JSON；不指定时用命令行参数生成单条流
    #[arg(long)]
    scenario: Option<PathBuf>,
    /// 两端网卡线速（Gbps）
    #[arg(long)]
    rate_gbps: Option<u64>,
    /// 信道单向传播时延（微秒）
    #[arg(long)]
    delay_us: Option<u64>,
    /// 帧间隔（纳秒）
    #[arg(long)]
    ifg_ns: Option<u64>,
    #[arg(long, default_value_t = 1500)]
    pkt_bytes: u32,
    #[arg(long, default_value_t = 10)]
    pkts: u64,
    /// 默认流使用的优先级队列
    #[arg(long, default_value_t = 0)]
    queue: usize,
    /// 仿真运行到多少毫秒；不指定时运行到事件耗尽
    #[arg(long)]
    until_ms: Option<u64>,
    /// 输出观测事件 JSON
    #[arg(long)]
    trace_json: Option<PathBuf>,
}

fn main() {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();

    let mut spec = match &args.scenario {
        Some(path) => match ScenarioSpec::load(path) {
            Ok(spec) => spec,
            Err(e) => {
                eprintln!("error: {e}");
                std::process::exit(2);
            }
        },
        None => ScenarioSpec {
            flows: vec![FlowSpec {
                queue: args.queue,
                count: args.pkts,
                pkt_bytes: args.pkt_bytes,
                ..FlowSpec::default()
            }],
            ..ScenarioSpec::default()
        },
    };

    if let Some(g) = args.rate_gbps {
        let bps = g.saturating_mul(1_000_000_000);
        spec.sender.data_rate_bps = bps;
        spec.receiver.data_rate_bps = bps;
    }
    if let Some(us) = args.delay_us {
        spec.channel.delay_ns = SimTime::from_micros(us).0;
    }
    if let Some(ns) = args.ifg_ns {
        spec.sender.interframe_gap_ns = ns;
        spec.receiver.interframe_gap_ns = ns;
    }
    if let Some(ms) = args.until_ms {
        spec.until_ns = Some(SimTime::from_millis(ms).0);
    }
    if let Err(e) = spec.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    if args.trace_json.is_some() {
        world.net.trace = Some(TraceLogger::default());
    }

    let nodes = build_two_node(&mut world, &spec);
    world.net.emit_trace_meta();
    schedule_scenario(&mut sim, &spec, &nodes);

    info!(flows = spec.flows.len(), pauses = spec.pauses.len(), "场景已调度");
    match spec.until_ns {
        Some(ns) => sim.run_until(SimTime(ns), &mut world),
        None => sim.run(&mut world),
    }

    let dropped: u64 = world.net.devices().iter().map(|d| d.stats.dropped).sum();
    println!(
        "done @ {:?}, delivered_pkts={}, delivered_bytes={}, dropped={}",
        sim.now(),
        world.net.stats.delivered_pkts,
        world.net.stats.delivered_bytes,
        dropped
    );

    if let Some(path) = args.trace_json {
        if let Some(t) = world.net.trace.take() {
            let json = t.to_json_pretty().expect("serialize trace events");
            fs::write(&path, json).expect("write trace json");
            eprintln!("wrote trace events to {}", path.display());
        }
    }
}
