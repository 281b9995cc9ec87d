//! 网卡发送相关事件
//!
//! - `TransmitComplete`：序列化 + 帧间隔结束，状态机回到 READY 并继续出队
//! - `DrainQueues`：延后的出队尝试（可被取消/提前）

use super::id::DeviceId;
use super::net_world::NetWorld;
use crate::sim::{Event, Simulator, World};

/// 事件：一次发送完成。发送一旦开始就不可取消。
#[derive(Debug)]
pub struct TransmitComplete {
    pub dev: DeviceId,
}

impl Event for TransmitComplete {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let TransmitComplete { dev } = *self;
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        w.net.transmit_complete(dev, sim);
    }
}

/// 事件：尝试从出口队列取包发送
#[derive(Debug)]
pub struct DrainQueues {
    pub dev: DeviceId,
}

impl Event for DrainQueues {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let DrainQueues { dev } = *self;
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        w.net.dequeue_and_transmit(dev, sim);
    }
}
