//! 数据包类型
//!
//! 包头字节放在 `data` 里，`size_bytes` 是线上大小（决定序列化时延）。

use bytes::{Bytes, BytesMut};

use super::id::DeviceId;
use crate::codec::Header;

/// 网络数据包
#[derive(Debug, Clone)]
pub struct Packet {
    pub id: u64,
    /// 线上字节数（头 + 载荷）
    pub size_bytes: u32,
    /// 编码后的包头（载荷不建模）
    pub data: Bytes,
    /// 入口网卡标签：仅在仿真内部使用，出队发送前剥离
    pub ingress: Option<DeviceId>,
}

impl Packet {
    pub fn new(id: u64, size_bytes: u32, data: Bytes) -> Self {
        Self {
            id,
            size_bytes,
            data,
            ingress: None,
        }
    }

    /// 编码 `hdr` 作为包头；线上大小至少为头长
    pub fn with_header(id: u64, hdr: &Header, size_bytes: u32) -> Self {
        let data = hdr.to_bytes();
        let size_bytes = size_bytes.max(data.len() as u32);
        Self::new(id, size_bytes, data)
    }

    /// 按 `hdr` 的层配置解码包头（只窥视，不修改 packet）
    pub fn peek_header(&self, hdr: &mut Header) -> usize {
        hdr.deserialize(&self.data)
    }

    /// 用修改后的头重新编码前 `hdr.serialized_size()` 个字节，其余字节保留
    pub fn rewrite_header(&mut self, hdr: &Header) {
        let len = hdr.serialized_size();
        let mut buf = BytesMut::with_capacity(len.max(self.data.len()));
        hdr.serialize(&mut buf);
        if self.data.len() > len {
            buf.extend_from_slice(&self.data[len..]);
        }
        self.data = buf.freeze();
        self.size_bytes = self.size_bytes.max(self.data.len() as u32);
    }
}
