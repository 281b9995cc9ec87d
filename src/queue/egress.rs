//! 多优先级出口队列组
//!
//! `queue_count` 个 FIFO（按优先级 0..n 编号）+ 一个并行的暂停位图。
//! 被暂停的队列永远不会被出队选中。

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::fifo::FifoQueue;
use crate::net::Packet;

/// 默认队列（优先级）数
pub const DEFAULT_QUEUE_COUNT: usize = 8;

/// 出队时在“未暂停且非空”的队列之间如何选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// 从上次服务的队列之后开始循环查找
    #[default]
    RoundRobin,
    /// 总是选编号最小的队列
    StrictPriority,
}

#[derive(Debug)]
pub struct EgressQueueSet {
    queues: Vec<FifoQueue>,
    paused: Vec<bool>,
    policy: SelectionPolicy,
    /// 轮询游标：下一次从它之后开始找
    rr_last: usize,
    last_served: Option<usize>,
}

impl EgressQueueSet {
    pub fn new(count: usize, policy: SelectionPolicy) -> Self {
        assert!(count > 0, "egress queue set needs at least one queue");
        Self {
            queues: (0..count).map(|_| FifoQueue::new()).collect(),
            paused: vec![false; count],
            policy,
            // 第一次轮询从 0 号队列开始
            rr_last: count - 1,
            last_served: None,
        }
    }

    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// 追加到指定队列尾部
    pub fn enqueue(&mut self, queue: usize, pkt: Packet) {
        assert!(
            queue < self.queues.len(),
            "queue index {queue} out of range (queue_count={})",
            self.queues.len()
        );
        self.queues[queue].enqueue(pkt);
    }

    /// 选出下一个可服务队列并出队一个 packet，返回 `(队列编号, packet)`。
    /// 所有队列都为空或被暂停时返回 None。
    pub fn dequeue(&mut self) -> Option<(usize, Packet)> {
        let n = self.queues.len();
        let eligible = |idx: usize| !self.paused[idx] && !self.queues[idx].is_empty();
        let picked = match self.policy {
            SelectionPolicy::RoundRobin => (1..=n)
                .map(|k| (self.rr_last + k) % n)
                .find(|&idx| eligible(idx)),
            SelectionPolicy::StrictPriority => (0..n).find(|&idx| eligible(idx)),
        }?;

        let pkt = self.queues[picked].dequeue()?;
        self.rr_last = picked;
        self.last_served = Some(picked);
        trace!(queue = picked, pkt_id = pkt.id, "出队");
        Some((picked, pkt))
    }

    /// 上一次出队服务的队列（供观测使用）
    pub fn last_served(&self) -> Option<usize> {
        self.last_served
    }

    pub fn set_paused(&mut self, queue: usize, paused: bool) {
        assert!(queue < self.paused.len(), "queue index {queue} out of range");
        self.paused[queue] = paused;
    }

    pub fn is_paused(&self, queue: usize) -> bool {
        self.paused[queue]
    }

    pub fn paused(&self) -> &[bool] {
        &self.paused
    }

    pub fn unpause_all(&mut self) {
        self.paused.iter_mut().for_each(|p| *p = false);
    }

    pub fn len(&self, queue: usize) -> usize {
        self.queues[queue].len()
    }

    pub fn bytes(&self, queue: usize) -> u64 {
        self.queues[queue].bytes()
    }

    pub fn total_len(&self) -> usize {
        self.queues.iter().map(FifoQueue::len).sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.queues.iter().map(FifoQueue::bytes).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.iter().all(FifoQueue::is_empty)
    }
}
