//! 网卡配置
//!
//! 构造时注入，不依赖任何全局注册表。

use serde::{Deserialize, Serialize};

use crate::codec::DecodeMode;
use crate::queue::{DEFAULT_QUEUE_COUNT, SelectionPolicy};
use crate::sim::SimTime;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// 线速（bps）
    pub data_rate_bps: u64,
    /// 帧间隔（ns），加在每次发送完成之前
    pub interframe_gap_ns: u64,
    /// 优先级队列数
    pub queue_count: usize,
    pub selection: SelectionPolicy,
    /// 接收时网络层的解码模式
    pub decode_mode: DecodeMode,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            data_rate_bps: 100_u64 * 1_000_000_000,
            interframe_gap_ns: 0,
            queue_count: DEFAULT_QUEUE_COUNT,
            selection: SelectionPolicy::RoundRobin,
            decode_mode: DecodeMode::Brief,
        }
    }
}

impl DeviceConfig {
    pub fn interframe_gap(&self) -> SimTime {
        SimTime(self.interframe_gap_ns)
    }

    /// 发送 `bytes` 所需的序列化时间
    pub fn tx_time(&self, bytes: u32) -> SimTime {
        tx_time(bytes, self.data_rate_bps)
    }
}

/// ceil(bytes*8 / bps) 秒 -> 纳秒；bps 为 0 时视为“几乎发不出去”
pub fn tx_time(bytes: u32, bps: u64) -> SimTime {
    if bps == 0 {
        return SimTime(u64::MAX / 4);
    }
    let bits = (bytes as u128).saturating_mul(8);
    let nanos = (bits.saturating_mul(1_000_000_000u128) + (bps as u128 - 1)) / bps as u128;
    SimTime(nanos.min(u64::MAX as u128) as u64)
}
