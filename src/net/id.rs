//! 标识符类型
//!
//! 定义网卡（设备）和信道的唯一标识符。

/// 网卡标识符，同时作为接口身份打到入站 packet 上
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub usize);

/// 信道标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub usize);
