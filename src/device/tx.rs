//! 半双工发送状态机
//!
//! `step(event)` 只改状态并返回需要执行的后续动作，不碰调度器，
//! 由 `Network` 负责把动作落到仿真器/信道上。

use crate::net::Packet;
use crate::sim::SimTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxState {
    #[default]
    Ready,
    Busy,
}

#[derive(Debug)]
pub enum TxEvent {
    /// 开始发送一个 packet（要求 READY）
    Start(Packet),
    /// 序列化 + 帧间隔结束（要求 BUSY）
    Complete,
}

/// 状态转移产生的后续动作，按顺序执行
#[derive(Debug)]
pub enum FollowUp {
    /// 观测：开始发送
    TxBegun(Packet),
    /// 在 `after` 之后触发 `TxEvent::Complete`
    ScheduleComplete { after: SimTime },
    /// 交给信道，传播时延由信道自己加
    HandToChannel { pkt: Packet, tx_time: SimTime },
    /// 观测：发送结束
    TxEnded(Packet),
    /// 立即再尝试出队
    Drain,
}

#[derive(Debug)]
pub struct TxMachine {
    state: TxState,
    current: Option<Packet>,
    data_rate_bps: u64,
    interframe_gap: SimTime,
}

impl TxMachine {
    pub fn new(data_rate_bps: u64, interframe_gap: SimTime) -> Self {
        Self {
            state: TxState::Ready,
            current: None,
            data_rate_bps,
            interframe_gap,
        }
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state == TxState::Busy
    }

    /// 正在发送的 packet（BUSY 时一定存在）
    pub fn current(&self) -> Option<&Packet> {
        self.current.as_ref()
    }

    pub fn step(&mut self, ev: TxEvent) -> Vec<FollowUp> {
        match ev {
            TxEvent::Start(pkt) => {
                assert!(self.state == TxState::Ready, "Must be READY to transmit");
                let tx_time = super::config::tx_time(pkt.size_bytes, self.data_rate_bps);
                let after = tx_time.saturating_add(self.interframe_gap);
                self.state = TxState::Busy;
                self.current = Some(pkt.clone());
                vec![
                    FollowUp::TxBegun(pkt.clone()),
                    FollowUp::ScheduleComplete { after },
                    FollowUp::HandToChannel { pkt, tx_time },
                ]
            }
            TxEvent::Complete => {
                assert!(self.state == TxState::Busy, "Must be BUSY if transmitting");
                let pkt = self
                    .current
                    .take()
                    .expect("BUSY state always holds the in-flight packet");
                self.state = TxState::Ready;
                vec![FollowUp::TxEnded(pkt), FollowUp::Drain]
            }
        }
    }
}
