//! 点到点信道
//!
//! 恰好两个端点，每个端点占一条“线”：`src` 为发送方，`dst` 为对端。
//! 两端都接上之前不允许发送；接第三个端点是调用方的 bug。

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::deliver_packet::DeliverPacket;
use super::id::{ChannelId, DeviceId};
use super::packet::Packet;
use crate::sim::{SimTime, Simulator};

/// 信道配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// 单向传播时延（ns），与序列化时延无关
    pub delay_ns: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            delay_ns: SimTime::from_micros(1).0,
        }
    }
}

impl ChannelConfig {
    pub fn delay(&self) -> SimTime {
        SimTime(self.delay_ns)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("channel has {attached} of 2 endpoints attached")]
    NotAttached { attached: usize },
    #[error("device {0:?} is not attached to this channel")]
    UnknownEndpoint(DeviceId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WireState {
    Initializing,
    Idle,
}

#[derive(Debug, Clone, Copy)]
struct Wire {
    src: Option<DeviceId>,
    dst: Option<DeviceId>,
    state: WireState,
}

impl Wire {
    const EMPTY: Wire = Wire {
        src: None,
        dst: None,
        state: WireState::Initializing,
    };
}

/// 一次成功交给信道的传输
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelTx {
    pub from: DeviceId,
    pub to: DeviceId,
    /// 开始发送时刻
    pub tx_at: SimTime,
    /// 对端收到时刻 = tx_at + 序列化时延 + 传播时延
    pub rx_at: SimTime,
}

#[derive(Debug)]
pub struct Channel {
    id: ChannelId,
    delay: SimTime,
    wires: [Wire; 2],
    attached: usize,
}

impl Channel {
    pub fn new(id: ChannelId, cfg: &ChannelConfig) -> Self {
        Self {
            id,
            delay: cfg.delay(),
            wires: [Wire::EMPTY; 2],
            attached: 0,
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn delay(&self) -> SimTime {
        self.delay
    }

    pub fn attached(&self) -> usize {
        self.attached
    }

    /// 接入一个端点；第二个接入时两端互为对端，两条线进入 Idle
    pub fn attach(&mut self, dev: DeviceId) {
        assert!(self.attached < 2, "Only two devices permitted on {:?}", self.id);

        self.wires[self.attached].src = Some(dev);
        self.attached += 1;
        debug!(channel = ?self.id, dev = ?dev, attached = self.attached, "端点接入");

        if self.attached == 2 {
            self.wires[0].dst = self.wires[1].src;
            self.wires[1].dst = self.wires[0].src;
            self.wires[0].state = WireState::Idle;
            self.wires[1].state = WireState::Idle;
            info!(channel = ?self.id, a = ?self.wires[0].src, b = ?self.wires[1].src, "🔗 信道两端就绪");
        }
    }

    pub fn is_ready(&self) -> bool {
        self.wires.iter().all(|w| w.state == WireState::Idle)
    }

    /// 第 `i` 个接入的端点
    pub fn device(&self, i: usize) -> Option<DeviceId> {
        self.wires.get(i).and_then(|w| w.src)
    }

    pub fn peer_of(&self, dev: DeviceId) -> Option<DeviceId> {
        self.wires.iter().find(|w| w.src == Some(dev)).and_then(|w| w.dst)
    }

    /// 开始把 `pkt` 送往 `src` 的对端：在 `now + tx_time + delay` 调度对端接收
    pub fn transmit_start(
        &self,
        pkt: Packet,
        src: DeviceId,
        tx_time: SimTime,
        sim: &mut Simulator,
    ) -> Result<ChannelTx, ChannelError> {
        if !self.is_ready() {
            return Err(ChannelError::NotAttached {
                attached: self.attached,
            });
        }
        let wire = self
            .wires
            .iter()
            .find(|w| w.src == Some(src))
            .ok_or(ChannelError::UnknownEndpoint(src))?;
        let to = wire.dst.ok_or(ChannelError::NotAttached {
            attached: self.attached,
        })?;

        let tx_at = sim.now();
        let rx_at = tx_at.saturating_add(tx_time).saturating_add(self.delay);
        debug!(
            channel = ?self.id,
            pkt_id = pkt.id,
            from = ?src,
            to = ?to,
            tx_time = ?tx_time,
            rx_at = ?rx_at,
            "调度对端接收"
        );
        sim.schedule(rx_at, DeliverPacket { to, pkt });

        Ok(ChannelTx {
            from: src,
            to,
            tx_at,
            rx_at,
        })
    }
}
