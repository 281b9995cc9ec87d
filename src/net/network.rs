//! 网卡与信道的集合
//!
//! 对外暴露的网卡操作（Receive / Send / Resume / TakeDown / UpdateNextAvailable）
//! 都在这里实现：它们需要同时借用网卡、信道、仿真器和观测记录。

use tracing::{debug, info, trace, warn};

use super::channel::{Channel, ChannelConfig, ChannelError};
use super::error_model::ErrorModel;
use super::forward::Forwarder;
use super::id::{ChannelId, DeviceId};
use super::packet::Packet;
use super::stats::Stats;
use super::tx_events::{DrainQueues, TransmitComplete};
use crate::codec::{Header, LayerMask};
use crate::device::{DeviceConfig, FollowUp, NetDevice, TxEvent};
use crate::sim::{SimTime, Simulator};
use crate::trace::{DropReason, TraceLogger};

#[derive(Default)]
pub struct Network {
    devices: Vec<NetDevice>,
    channels: Vec<Channel>,
    next_pkt_id: u64,
    /// 外部转发决策；None 时收到的 packet 直接算作送达
    pub forwarder: Option<Box<dyn Forwarder>>,
    pub trace: Option<TraceLogger>,
    pub stats: Stats,
}

impl Network {
    /// 添加网卡
    pub fn add_device(&mut self, name: impl Into<String>, cfg: DeviceConfig) -> DeviceId {
        let id = DeviceId(self.devices.len());
        self.devices.push(NetDevice::new(id, name, cfg));
        id
    }

    /// 添加信道（尚未接入端点）
    pub fn add_channel(&mut self, cfg: &ChannelConfig) -> ChannelId {
        let id = ChannelId(self.channels.len());
        self.channels.push(Channel::new(id, cfg));
        id
    }

    /// 网卡接入信道并置为 link up
    pub fn attach(&mut self, dev: DeviceId, ch: ChannelId) {
        self.channels[ch.0].attach(dev);
        let d = &mut self.devices[dev.0];
        d.channel = Some(ch);
        d.link_up = true;
        info!(dev = ?dev, channel = ?ch, "网卡接入信道，link up");
    }

    /// 新建信道并把两块网卡接上
    pub fn connect(&mut self, a: DeviceId, b: DeviceId, cfg: &ChannelConfig) -> ChannelId {
        let ch = self.add_channel(cfg);
        self.attach(a, ch);
        self.attach(b, ch);
        ch
    }

    pub fn device(&self, id: DeviceId) -> &NetDevice {
        &self.devices[id.0]
    }

    pub fn devices(&self) -> &[NetDevice] {
        &self.devices
    }

    pub fn channel(&self, id: ChannelId) -> &Channel {
        &self.channels[id.0]
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn set_error_model(&mut self, dev: DeviceId, model: Box<dyn ErrorModel>) {
        self.devices[dev.0].error_model = Some(model);
    }

    /// 创建数据包并编码包头
    pub fn make_packet(&mut self, hdr: &Header, size_bytes: u32) -> Packet {
        let id = self.next_pkt_id;
        self.next_pkt_id = self.next_pkt_id.wrapping_add(1);
        Packet::with_header(id, hdr, size_bytes)
    }

    /// 信道把 packet 交到本网卡
    #[tracing::instrument(skip(self, sim, pkt), fields(dev = ?dev, pkt_id = pkt.id))]
    pub fn receive(&mut self, dev: DeviceId, mut pkt: Packet, sim: &mut Simulator) {
        let now = sim.now();
        let d = &mut self.devices[dev.0];

        if !d.link_up {
            d.stats.dropped += 1;
            debug!("link down，丢弃");
            self.trace_drop(now, dev, &pkt, None, DropReason::LinkDown);
            return;
        }

        if let Some(model) = d.error_model.as_mut() {
            if model.is_corrupt(&pkt) {
                d.stats.dropped += 1;
                debug!("错误模型判定损坏，丢弃");
                self.trace_drop(now, dev, &pkt, None, DropReason::Corrupt);
                return;
            }
        }

        d.stats.rx_pkts += 1;
        d.stats.rx_bytes += pkt.size_bytes as u64;

        let mut hdr = Header::new(LayerMask::ALL);
        hdr.mode = d.config().decode_mode;
        hdr.parse_telemetry = true;
        let consumed = pkt.peek_header(&mut hdr);
        if consumed == 0 {
            debug!("包头无法分类");
        }
        self.trace_receive(now, dev, &pkt, hdr.ip.protocol, consumed);

        pkt.ingress = Some(dev);
        let Some(mut fwd) = self.forwarder.take() else {
            self.on_delivered(dev, pkt, sim);
            return;
        };
        fwd.forward(dev, pkt, &hdr, sim, self);
        self.forwarder = Some(fwd);
    }

    /// 转发决策选定队列后入队并尝试发送
    #[tracing::instrument(skip(self, sim, pkt, hdr), fields(dev = ?dev, pkt_id = pkt.id))]
    pub fn send(
        &mut self,
        dev: DeviceId,
        queue: usize,
        pkt: Packet,
        hdr: &Header,
        sim: &mut Simulator,
    ) {
        let d = &mut self.devices[dev.0];
        d.queues.enqueue(queue, pkt.clone());
        d.stats.enqueued += 1;
        let q_len = d.queues.len(queue);
        trace!(protocol = hdr.ip.protocol, ecn = hdr.ecn(), q_len, "入队");
        self.trace_enqueue(sim.now(), dev, &pkt, queue, q_len);

        self.dequeue_and_transmit(dev, sim);
    }

    /// 暂停一个优先级队列
    pub fn pause(&mut self, dev: DeviceId, queue: usize, sim: &mut Simulator) {
        self.devices[dev.0].queues.set_paused(queue, true);
        info!(dev = ?dev, queue, now = ?sim.now(), "⏸️  队列暂停");
        self.trace_pause(sim.now(), dev, queue);
    }

    /// 恢复一个被暂停的队列，并立即尝试出队
    pub fn resume(&mut self, dev: DeviceId, queue: usize, sim: &mut Simulator) {
        let d = &mut self.devices[dev.0];
        assert!(d.queues.is_paused(queue), "Must be PAUSEd");
        d.queues.set_paused(queue, false);
        info!(dev = ?dev, queue, now = ?sim.now(), "▶️  队列恢复");
        self.trace_resume(sim.now(), dev, queue);

        self.dequeue_and_transmit(dev, sim);
    }

    /// 管理性关闭：置 link down，强制解除所有暂停，逐个丢弃队列中的 packet
    pub fn take_down(&mut self, dev: DeviceId, sim: &mut Simulator) {
        let now = sim.now();
        let d = &mut self.devices[dev.0];
        d.link_up = false;
        d.queues.unpause_all();
        info!(dev = ?dev, pending = d.queues.total_len(), "⛔ 网卡关闭");
        self.trace_link_down(now, dev);

        while let Some((queue, pkt)) = self.devices[dev.0].queues.dequeue() {
            self.devices[dev.0].stats.dropped += 1;
            self.trace_drop(now, dev, &pkt, Some(queue), DropReason::TakeDown);
        }
    }

    /// 在 `at` 安排一次出队尝试（已有待执行的尝试时先取消）
    pub fn schedule_drain_at(&mut self, dev: DeviceId, at: SimTime, sim: &mut Simulator) {
        if let Some(prev) = self.devices[dev.0].next_send.take() {
            sim.cancel(prev);
        }
        let id = sim.schedule(at, DrainQueues { dev });
        self.devices[dev.0].next_send = Some(id);
        debug!(dev = ?dev, at = ?at, "安排下一次出队尝试");
    }

    /// 外部限速器把下一次可发送时间提前到 `t`：若待执行的出队尝试晚于 `t`，
    /// 取消并改到 `max(t, now)`
    pub fn update_next_available(&mut self, dev: DeviceId, t: SimTime, sim: &mut Simulator) {
        let d = &mut self.devices[dev.0];
        let Some(pending) = d.next_send else {
            return;
        };
        let Some(at) = sim.scheduled_at(pending) else {
            return;
        };
        if t < at {
            sim.cancel(pending);
            let delta = t.saturating_sub(sim.now());
            d.next_send = Some(sim.schedule_after(delta, DrainQueues { dev }));
            debug!(dev = ?dev, from = ?at, to = ?t, "提前下一次出队尝试");
        }
    }

    /// 取一个可发送的 packet 交给状态机；link down 或 BUSY 时什么都不做
    pub fn dequeue_and_transmit(&mut self, dev: DeviceId, sim: &mut Simulator) {
        let d = &mut self.devices[dev.0];
        if !d.link_up || d.tx.is_busy() {
            return;
        }
        let Some((queue, mut pkt)) = d.queues.dequeue() else {
            debug!(dev = ?dev, "PAUSE 或队列为空，无法发送");
            return;
        };
        d.stats.dequeued += 1;
        // 剥离仿真内部的入口标签
        pkt.ingress = None;
        self.trace_dequeue(sim.now(), dev, &pkt, queue);

        self.transmit_start(dev, pkt, sim);
    }

    /// 开始发送；信道拒绝时 packet 被丢弃并返回 false。
    /// 状态机不在 READY 时直接 panic（同一根线上不能有两次发送）。
    pub(crate) fn transmit_start(&mut self, dev: DeviceId, pkt: Packet, sim: &mut Simulator) -> bool {
        let d = &mut self.devices[dev.0];
        if !d.link_up {
            d.stats.dropped += 1;
            self.trace_drop(sim.now(), dev, &pkt, None, DropReason::LinkDown);
            return false;
        }
        let ups = d.tx.step(TxEvent::Start(pkt));
        self.apply(dev, ups, sim)
    }

    /// 发送完成：回到 READY 并继续出队
    pub(crate) fn transmit_complete(&mut self, dev: DeviceId, sim: &mut Simulator) {
        let ups = self.devices[dev.0].tx.step(TxEvent::Complete);
        self.apply(dev, ups, sim);
    }

    /// 执行状态机给出的后续动作；返回信道是否接受了传输
    fn apply(&mut self, dev: DeviceId, ups: Vec<FollowUp>, sim: &mut Simulator) -> bool {
        let mut accepted = true;
        for up in ups {
            match up {
                FollowUp::TxBegun(pkt) => {
                    let d = &mut self.devices[dev.0];
                    d.stats.tx_pkts += 1;
                    d.stats.tx_bytes += pkt.size_bytes as u64;
                    self.trace_tx_begin(sim.now(), dev, &pkt);
                }
                FollowUp::ScheduleComplete { after } => {
                    trace!(dev = ?dev, after = ?after, "调度 TransmitComplete");
                    sim.schedule_after(after, TransmitComplete { dev });
                }
                FollowUp::HandToChannel { pkt, tx_time } => {
                    accepted = self.hand_to_channel(dev, pkt, tx_time, sim);
                }
                FollowUp::TxEnded(pkt) => {
                    self.trace_tx_end(sim.now(), dev, &pkt);
                }
                FollowUp::Drain => self.dequeue_and_transmit(dev, sim),
            }
        }
        accepted
    }

    fn hand_to_channel(
        &mut self,
        dev: DeviceId,
        pkt: Packet,
        tx_time: SimTime,
        sim: &mut Simulator,
    ) -> bool {
        let (pkt_id, pkt_bytes) = (pkt.id, pkt.size_bytes);
        let result = match self.devices[dev.0].channel {
            Some(ch) => self.channels[ch.0].transmit_start(pkt, dev, tx_time, sim),
            None => Err(ChannelError::NotAttached { attached: 0 }),
        };
        match result {
            Ok(tx) => {
                self.trace_channel_tx(dev, pkt_id, pkt_bytes, &tx);
                true
            }
            Err(e) => {
                warn!(dev = ?dev, pkt_id, error = %e, "信道拒绝发送，丢弃");
                self.devices[dev.0].stats.dropped += 1;
                self.trace_drop_raw(sim.now(), dev, pkt_id, pkt_bytes, None, DropReason::ChannelRejected);
                false
            }
        }
    }

    /// 数据包到达终点时的处理
    pub fn on_delivered(&mut self, at: DeviceId, pkt: Packet, sim: &mut Simulator) {
        self.stats.delivered_pkts += 1;
        self.stats.delivered_bytes += pkt.size_bytes as u64;
        debug!(
            dev = ?at,
            pkt_id = pkt.id,
            delivered_pkts = self.stats.delivered_pkts,
            "✅ 数据包送达"
        );
        self.trace_delivered(sim.now(), at, &pkt);
    }
}
