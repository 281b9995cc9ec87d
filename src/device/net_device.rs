//! 网卡状态
//!
//! 一个网卡独占：出口队列组、发送状态机、链路开关、下一次出队事件。
//! 对外操作由 `Network` 实现（需要同时借用信道与仿真器）。

use super::config::DeviceConfig;
use super::tx::TxMachine;
use crate::net::{ChannelId, DeviceId, DeviceStats, ErrorModel};
use crate::queue::EgressQueueSet;
use crate::sim::EventId;

pub struct NetDevice {
    id: DeviceId,
    name: String,
    cfg: DeviceConfig,
    pub(crate) link_up: bool,
    pub(crate) queues: EgressQueueSet,
    pub(crate) tx: TxMachine,
    pub(crate) channel: Option<ChannelId>,
    /// 延后的出队尝试（可被 `update_next_available` 提前）
    pub(crate) next_send: Option<EventId>,
    pub(crate) error_model: Option<Box<dyn ErrorModel>>,
    pub stats: DeviceStats,
}

impl NetDevice {
    pub fn new(id: DeviceId, name: impl Into<String>, cfg: DeviceConfig) -> Self {
        let queues = EgressQueueSet::new(cfg.queue_count, cfg.selection);
        let tx = TxMachine::new(cfg.data_rate_bps, cfg.interframe_gap());
        Self {
            id,
            name: name.into(),
            cfg,
            link_up: false,
            queues,
            tx,
            channel: None,
            next_send: None,
            error_model: None,
            stats: DeviceStats::default(),
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.cfg
    }

    pub fn is_link_up(&self) -> bool {
        self.link_up
    }

    pub fn queues(&self) -> &EgressQueueSet {
        &self.queues
    }

    pub fn tx(&self) -> &TxMachine {
        &self.tx
    }

    pub fn channel(&self) -> Option<ChannelId> {
        self.channel
    }

    pub fn queue_count(&self) -> usize {
        self.queues.queue_count()
    }
}
