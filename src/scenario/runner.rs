//! 场景搭建与流量注入事件

use tracing::{debug, info};

use super::spec::{FlowProtocol, FlowSpec, ScenarioSpec};
use crate::codec::{
    FeedbackHeader, FeedbackKind, Header, LayerMask, TcpHeader, Transport, UdpHeader,
};
use crate::net::{ChannelId, DeviceId, NetWorld};
use crate::sim::{Event, SimTime, Simulator, World};

const SENDER_ADDR: u32 = 0x0b00_0001;
const RECEIVER_ADDR: u32 = 0x0b00_0101;

/// 搭好的两节点拓扑
#[derive(Debug, Clone, Copy)]
pub struct TwoNode {
    pub sender: DeviceId,
    pub receiver: DeviceId,
    pub channel: ChannelId,
}

/// 构建 sender <-> receiver 两块网卡与一条信道
pub fn build_two_node(world: &mut NetWorld, spec: &ScenarioSpec) -> TwoNode {
    let sender = world.net.add_device("sender", spec.sender.clone());
    let receiver = world.net.add_device("receiver", spec.receiver.clone());
    let channel = world.net.connect(sender, receiver, &spec.channel);
    info!(
        sender_bps = spec.sender.data_rate_bps,
        receiver_bps = spec.receiver.data_rate_bps,
        delay_ns = spec.channel.delay_ns,
        "🔧 两节点拓扑已构建"
    );
    TwoNode {
        sender,
        receiver,
        channel,
    }
}

/// 按场景描述调度流量、暂停/恢复与关闭事件
pub fn schedule_scenario(sim: &mut Simulator, spec: &ScenarioSpec, nodes: &TwoNode) {
    // 同一时刻先暂停再注入：t=0 的暂停能挡住 t=0 的第一个包
    for p in &spec.pauses {
        sim.schedule(
            SimTime(p.pause_at_ns),
            PauseQueue {
                dev: nodes.sender,
                queue: p.queue,
            },
        );
        if let Some(at) = p.resume_at_ns {
            sim.schedule(
                SimTime(at),
                ResumeQueue {
                    dev: nodes.sender,
                    queue: p.queue,
                },
            );
        }
    }
    for (i, f) in spec.flows.iter().enumerate() {
        if f.count == 0 {
            continue;
        }
        debug!(flow = i, queue = f.queue, count = f.count, "调度流量");
        sim.schedule(
            SimTime(f.start_ns),
            InjectFlow {
                dev: nodes.sender,
                queue: f.queue,
                hdr: flow_header(f, i as u16),
                pkt_bytes: f.pkt_bytes,
                remaining: f.count,
                gap: SimTime(f.gap_ns),
            },
        );
    }
    if let Some(at) = spec.take_down_at_ns {
        sim.schedule(SimTime(at), TakeDown { dev: nodes.sender });
    }
}

/// 一条流的首个包头；端口用流序号区分
fn flow_header(f: &FlowSpec, flow: u16) -> Header {
    let sport = 10_000 + flow;
    let dport = 100;
    let mut hdr = match f.protocol {
        FlowProtocol::Tcp => Header::tcp(
            LayerMask::ALL,
            SENDER_ADDR,
            RECEIVER_ADDR,
            TcpHeader {
                sport,
                dport,
                int_pg: f.queue as u16,
                ..TcpHeader::default()
            },
        ),
        FlowProtocol::Udp => Header::udp(
            LayerMask::ALL,
            SENDER_ADDR,
            RECEIVER_ADDR,
            UdpHeader {
                sport,
                dport,
                payload_size: f.pkt_bytes.min(u16::MAX as u32) as u16,
            },
        ),
        FlowProtocol::Ack | FlowProtocol::Nack => Header::feedback(
            LayerMask::ALL,
            SENDER_ADDR,
            RECEIVER_ADDR,
            FeedbackHeader {
                kind: if f.protocol == FlowProtocol::Ack {
                    FeedbackKind::Ack
                } else {
                    FeedbackKind::Nack
                },
                sport,
                dport,
                pg: f.queue as u16,
                ..FeedbackHeader::default()
            },
        ),
    };
    hdr.ip.tos = f.tos;
    hdr.ip.ttl = 64;
    hdr.ip.payload_size = f.pkt_bytes.min(u16::MAX as u32) as u16;
    hdr
}

/// 流量注入事件：每次发一个 packet，间隔 `gap` 再调度自己
#[derive(Debug)]
pub struct InjectFlow {
    pub dev: DeviceId,
    pub queue: usize,
    pub hdr: Header,
    pub pkt_bytes: u32,
    pub remaining: u64,
    pub gap: SimTime,
}

impl Event for InjectFlow {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let mut me = *self;
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");

        if me.remaining == 0 {
            return;
        }

        let pkt = w.net.make_packet(&me.hdr, me.pkt_bytes);
        w.net.send(me.dev, me.queue, pkt, &me.hdr, sim);

        me.remaining -= 1;
        me.hdr.ip.id = me.hdr.ip.id.wrapping_add(1);
        match &mut me.hdr.transport {
            Transport::Tcp(tcp) => tcp.seq = tcp.seq.wrapping_add(me.pkt_bytes),
            Transport::Feedback(fb) => fb.seq = fb.seq.wrapping_add(me.pkt_bytes),
            _ => {}
        }
        if me.remaining > 0 {
            sim.schedule_after(me.gap, me);
        }
    }
}

/// 事件：暂停某个队列
#[derive(Debug)]
pub struct PauseQueue {
    pub dev: DeviceId,
    pub queue: usize,
}

impl Event for PauseQueue {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        if !w.net.device(self.dev).is_link_up() {
            debug!(dev = ?self.dev, queue = self.queue, "网卡已关闭，忽略暂停");
            return;
        }
        w.net.pause(self.dev, self.queue, sim);
    }
}

/// 事件：恢复某个队列
#[derive(Debug)]
pub struct ResumeQueue {
    pub dev: DeviceId,
    pub queue: usize,
}

impl Event for ResumeQueue {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        // 关闭网卡会强制解除所有暂停
        if !w.net.device(self.dev).queues().is_paused(self.queue) {
            debug!(dev = ?self.dev, queue = self.queue, "队列未暂停，忽略恢复");
            return;
        }
        w.net.resume(self.dev, self.queue, sim);
    }
}

/// 事件：管理性关闭网卡
#[derive(Debug)]
pub struct TakeDown {
    pub dev: DeviceId,
}

impl Event for TakeDown {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        w.net.take_down(self.dev, sim);
    }
}
