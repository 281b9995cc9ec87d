//! 单个优先级的 FIFO
//!
//! 本层不设容量上限；容量策略（如果需要）由外部决定。

use std::collections::VecDeque;

use crate::net::Packet;

#[derive(Debug, Default)]
pub struct FifoQueue {
    cur_bytes: u64,
    q: VecDeque<Packet>,
}

impl FifoQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 入队到尾部（无条件）
    pub fn enqueue(&mut self, pkt: Packet) {
        self.cur_bytes = self.cur_bytes.saturating_add(pkt.size_bytes as u64);
        self.q.push_back(pkt);
    }

    pub fn dequeue(&mut self) -> Option<Packet> {
        let pkt = self.q.pop_front()?;
        self.cur_bytes = self.cur_bytes.saturating_sub(pkt.size_bytes as u64);
        Some(pkt)
    }

    pub fn len(&self) -> usize {
        self.q.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    pub fn bytes(&self) -> u64 {
        self.cur_bytes
    }
}
