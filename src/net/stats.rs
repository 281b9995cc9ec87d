//! 统计信息
//!
//! 网络级（送达）与网卡级（入队/出队/丢包/收发）计数。

/// 网络统计信息
#[derive(Debug, Default, Clone)]
pub struct Stats {
    pub delivered_pkts: u64,
    pub delivered_bytes: u64,
}

/// 单个网卡的计数器
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeviceStats {
    pub enqueued: u64,
    pub dequeued: u64,
    pub dropped: u64,
    pub tx_pkts: u64,
    pub tx_bytes: u64,
    pub rx_pkts: u64,
    pub rx_bytes: u64,
}
