//! 网卡（传输引擎）
//!
//! 多队列出口缓冲 + 半双工发送状态机 + 按队列的暂停/恢复。

mod config;
mod net_device;
mod tx;

pub use config::{DeviceConfig, tx_time};
pub use net_device::NetDevice;
pub use tx::{FollowUp, TxEvent, TxMachine, TxState};
