//! 网络模块
//!
//! 网卡集合、点到点信道、数据包，以及接收侧的外部协作者（转发决策、错误模型）。

// 子模块声明
mod id;
mod packet;
mod stats;
mod channel;
mod network;
mod network_trace;
mod deliver_packet;
mod tx_events;
mod net_world;
mod forward;
mod error_model;

// 重新导出公共接口
pub use id::{ChannelId, DeviceId};
pub use packet::Packet;
pub use stats::{DeviceStats, Stats};
pub use channel::{Channel, ChannelConfig, ChannelError, ChannelTx};
pub use network::Network;
pub use deliver_packet::DeliverPacket;
pub use tx_events::{DrainQueues, TransmitComplete};
pub use net_world::NetWorld;
pub use forward::{Forwarder, Sink, StaticRoute};
pub use error_model::{ErrorModel, ListErrorModel};
