//! Trace hooks for the network.

use crate::sim::SimTime;
use crate::trace::{DropReason, TraceChannelInfo, TraceDeviceInfo, TraceEvent, TraceEventKind};

use super::channel::ChannelTx;
use super::{DeviceId, Network, Packet};

impl Network {
    fn trace_push(&mut self, ev: TraceEvent) {
        if let Some(t) = &mut self.trace {
            t.push(ev);
        }
    }

    fn trace_pkt(&mut self, now: SimTime, dev: DeviceId, pkt: &Packet, kind: TraceEventKind) {
        self.trace_push(TraceEvent {
            t_ns: now.0,
            dev: Some(dev.0),
            pkt_id: Some(pkt.id),
            pkt_bytes: Some(pkt.size_bytes),
            kind,
        });
    }

    fn trace_dev(&mut self, now: SimTime, dev: DeviceId, kind: TraceEventKind) {
        self.trace_push(TraceEvent {
            t_ns: now.0,
            dev: Some(dev.0),
            pkt_id: None,
            pkt_bytes: None,
            kind,
        });
    }

    /// 写入网卡/信道元信息（t=0）
    pub fn emit_trace_meta(&mut self) {
        if self.trace.is_none() {
            return;
        }
        let devices = self
            .devices()
            .iter()
            .map(|d| TraceDeviceInfo {
                id: d.id().0,
                name: d.name().to_string(),
                data_rate_bps: d.config().data_rate_bps,
                queue_count: d.queue_count(),
                selection: d.queues().policy(),
            })
            .collect::<Vec<_>>();
        let channels = self
            .channels()
            .iter()
            .map(|c| TraceChannelInfo {
                id: c.id().0,
                devices: (0..2).filter_map(|i| c.device(i)).map(|d| d.0).collect(),
                delay_ns: c.delay().0,
            })
            .collect::<Vec<_>>();
        self.trace_push(TraceEvent {
            t_ns: 0,
            dev: None,
            pkt_id: None,
            pkt_bytes: None,
            kind: TraceEventKind::Meta { devices, channels },
        });
    }

    pub(crate) fn trace_enqueue(
        &mut self,
        now: SimTime,
        dev: DeviceId,
        pkt: &Packet,
        queue: usize,
        q_len: usize,
    ) {
        self.trace_pkt(now, dev, pkt, TraceEventKind::Enqueue { queue, q_len });
    }

    pub(crate) fn trace_dequeue(&mut self, now: SimTime, dev: DeviceId, pkt: &Packet, queue: usize) {
        self.trace_pkt(now, dev, pkt, TraceEventKind::Dequeue { queue });
    }

    pub(crate) fn trace_drop(
        &mut self,
        now: SimTime,
        dev: DeviceId,
        pkt: &Packet,
        queue: Option<usize>,
        reason: DropReason,
    ) {
        self.trace_drop_raw(now, dev, pkt.id, pkt.size_bytes, queue, reason);
    }

    /// packet 已经被移交出去时只剩 id 与大小
    pub(crate) fn trace_drop_raw(
        &mut self,
        now: SimTime,
        dev: DeviceId,
        pkt_id: u64,
        pkt_bytes: u32,
        queue: Option<usize>,
        reason: DropReason,
    ) {
        self.trace_push(TraceEvent {
            t_ns: now.0,
            dev: Some(dev.0),
            pkt_id: Some(pkt_id),
            pkt_bytes: Some(pkt_bytes),
            kind: TraceEventKind::Drop { queue, reason },
        });
    }

    pub(crate) fn trace_tx_begin(&mut self, now: SimTime, dev: DeviceId, pkt: &Packet) {
        self.trace_pkt(now, dev, pkt, TraceEventKind::TxBegin);
    }

    pub(crate) fn trace_tx_end(&mut self, now: SimTime, dev: DeviceId, pkt: &Packet) {
        self.trace_pkt(now, dev, pkt, TraceEventKind::TxEnd);
    }

    pub(crate) fn trace_channel_tx(
        &mut self,
        dev: DeviceId,
        pkt_id: u64,
        pkt_bytes: u32,
        tx: &ChannelTx,
    ) {
        self.trace_push(TraceEvent {
            t_ns: tx.tx_at.0,
            dev: Some(dev.0),
            pkt_id: Some(pkt_id),
            pkt_bytes: Some(pkt_bytes),
            kind: TraceEventKind::ChannelTx {
                to: tx.to.0,
                tx_ns: tx.tx_at.0,
                rx_ns: tx.rx_at.0,
            },
        });
    }

    pub(crate) fn trace_receive(
        &mut self,
        now: SimTime,
        dev: DeviceId,
        pkt: &Packet,
        protocol: u8,
        consumed: usize,
    ) {
        self.trace_pkt(now, dev, pkt, TraceEventKind::Receive { protocol, consumed });
    }

    pub(crate) fn trace_pause(&mut self, now: SimTime, dev: DeviceId, queue: usize) {
        self.trace_dev(now, dev, TraceEventKind::Pause { queue });
    }

    pub(crate) fn trace_resume(&mut self, now: SimTime, dev: DeviceId, queue: usize) {
        self.trace_dev(now, dev, TraceEventKind::Resume { queue });
    }

    pub(crate) fn trace_link_down(&mut self, now: SimTime, dev: DeviceId) {
        self.trace_dev(now, dev, TraceEventKind::LinkDown);
    }

    pub(crate) fn trace_delivered(&mut self, now: SimTime, dev: DeviceId, pkt: &Packet) {
        self.trace_pkt(now, dev, pkt, TraceEventKind::Delivered);
    }
}
