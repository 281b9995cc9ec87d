use serde::{Deserialize, Serialize};

use crate::queue::SelectionPolicy;

/// 观测事件类型
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEventKind {
    /// 网卡/信道元信息（建议作为 t=0 的第一条事件）
    Meta {
        devices: Vec<TraceDeviceInfo>,
        channels: Vec<TraceChannelInfo>,
    },
    /// packet 进入某个优先级队列
    Enqueue { queue: usize, q_len: usize },
    /// packet 被选中出队，即将开始发送
    Dequeue { queue: usize },
    /// 丢包；`queue` 为 None 表示不在队列里（接收侧或在途）
    Drop {
        queue: Option<usize>,
        reason: DropReason,
    },
    /// 状态机 READY -> BUSY
    TxBegin,
    /// 状态机 BUSY -> READY
    TxEnd,
    /// 信道接受了一次传输
    ChannelTx { to: usize, tx_ns: u64, rx_ns: u64 },
    /// 网卡收到 packet 并交给转发决策
    Receive { protocol: u8, consumed: usize },
    Pause { queue: usize },
    Resume { queue: usize },
    /// 网卡被管理性关闭
    LinkDown,
    /// packet 在终点被标记为 delivered
    Delivered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    LinkDown,
    Corrupt,
    ChannelRejected,
    TakeDown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceDeviceInfo {
    pub id: usize,
    pub name: String,
    pub data_rate_bps: u64,
    pub queue_count: usize,
    pub selection: SelectionPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceChannelInfo {
    pub id: usize,
    /// 已接入的两个端点（网卡 id）
    pub devices: Vec<usize>,
    /// 单向传播时延（ns）
    pub delay_ns: u64,
}

/// 一条观测事件（JSON）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    /// 仿真时间（纳秒，和 `SimTime.0` 同口径）
    pub t_ns: u64,
    pub dev: Option<usize>,
    pub pkt_id: Option<u64>,
    pub pkt_bytes: Option<u32>,
    #[serde(flatten)]
    pub kind: TraceEventKind,
}

/// 一个简单的事件收集器（存内存，仿真结束写 JSON 文件）
#[derive(Debug, Default)]
pub struct TraceLogger {
    pub events: Vec<TraceEvent>,
}

impl TraceLogger {
    pub fn push(&mut self, ev: TraceEvent) {
        self.events.push(ev);
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.events)
    }
}
