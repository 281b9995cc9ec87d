//! 数据包交付事件
//!
//! 信道在传播完成时把 packet 交给对端网卡。

use super::id::DeviceId;
use super::net_world::NetWorld;
use super::packet::Packet;
use crate::sim::{Event, Simulator, World};
use tracing::{debug, info, trace};

/// 事件：把一个 packet 交给某个网卡的 Receive。
#[derive(Debug)]
pub struct DeliverPacket {
    pub to: DeviceId,
    pub pkt: Packet,
}

impl Event for DeliverPacket {
    #[tracing::instrument(skip(self, sim, world), fields(pkt_id = self.pkt.id, to = ?self.to))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let DeliverPacket { to, pkt } = *self;

        info!("📨 数据包到达事件执行");
        debug!(
            pkt_id = pkt.id,
            size_bytes = pkt.size_bytes,
            to = ?to,
            now = ?sim.now(),
            "数据包到达网卡"
        );

        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        w.net.receive(to, pkt, sim);

        trace!("DeliverPacket::execute 完成");
    }
}
