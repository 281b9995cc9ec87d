//! 转发决策
//!
//! 网卡收到 packet 后把 `(入口网卡, packet, 解码出的头)` 交给转发器；
//! 转发器选择出口网卡与优先级队列，再回调 `Network::send`。

use std::collections::HashMap;

use tracing::debug;

use super::id::DeviceId;
use super::network::Network;
use super::packet::Packet;
use crate::codec::{Header, IntHop};
use crate::sim::Simulator;

pub trait Forwarder: Send {
    fn forward(
        &mut self,
        ingress: DeviceId,
        pkt: Packet,
        hdr: &Header,
        sim: &mut Simulator,
        net: &mut Network,
    );
}

/// 终点：所有 packet 都在这里被标记为 delivered
#[derive(Debug, Default, Clone, Copy)]
pub struct Sink;

impl Forwarder for Sink {
    fn forward(
        &mut self,
        ingress: DeviceId,
        pkt: Packet,
        _hdr: &Header,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        net.on_delivered(ingress, pkt, sim);
    }
}

/// 静态端口映射：入口网卡 -> 出口网卡，队列取 DSCP 对队列数取模。
/// 没有映射的入口视为终点。
#[derive(Debug, Default, Clone)]
pub struct StaticRoute {
    routes: HashMap<DeviceId, DeviceId>,
    /// 转发时在 TCP/ACK/NACK 的 INT 子头里追加一跳
    pub stamp_int: bool,
}

impl StaticRoute {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, ingress: DeviceId, egress: DeviceId) -> Self {
        self.routes.insert(ingress, egress);
        self
    }
}

impl Forwarder for StaticRoute {
    fn forward(
        &mut self,
        ingress: DeviceId,
        mut pkt: Packet,
        hdr: &Header,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        let Some(&egress) = self.routes.get(&ingress) else {
            net.on_delivered(ingress, pkt, sim);
            return;
        };

        let out = net.device(egress);
        let queue = hdr.ip.dscp() as usize % out.queue_count();
        let mut hdr = *hdr;

        if self.stamp_int {
            let hop = IntHop::new(
                out.config().data_rate_bps,
                sim.now().0,
                out.stats.tx_bytes,
                out.queues().total_bytes(),
            );
            if let Some(int) = hdr.transport.int_mut() {
                if int.push_hop(hop) {
                    pkt.rewrite_header(&hdr);
                }
            }
        }

        debug!(ingress = ?ingress, egress = ?egress, queue, pkt_id = pkt.id, "转发");
        net.send(egress, queue, pkt, &hdr, sim);
    }
}
