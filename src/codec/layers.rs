//! 层选择与解码模式

use serde::{Deserialize, Serialize};
use std::ops::BitOr;

/// 启用哪些层（位掩码）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerMask(u8);

impl LayerMask {
    pub const LINK: LayerMask = LayerMask(1);
    pub const NETWORK: LayerMask = LayerMask(2);
    pub const TRANSPORT: LayerMask = LayerMask(4);
    pub const ALL: LayerMask = LayerMask(1 | 2 | 4);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: LayerMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        LayerMask::NETWORK | LayerMask::TRANSPORT
    }
}

impl BitOr for LayerMask {
    type Output = LayerMask;

    fn bitor(self, rhs: LayerMask) -> LayerMask {
        LayerMask(self.0 | rhs.0)
    }
}

/// 网络层/UDP 的解码模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeMode {
    /// 跳过长度/标志/ttl/校验和，头长固定 20 字节
    #[default]
    Brief,
    Full,
}
