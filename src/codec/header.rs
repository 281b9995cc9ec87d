//! 分层组合头
//!
//! 链路层（14 字节）+ 网络层（IPv4 形状，20 字节）+ 传输层（按协议号选择），
//! 每一层是否存在由 [`LayerMask`] 决定。

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::{trace, warn};

use super::ipv4::Ipv4Fields;
use super::layers::{DecodeMode, LayerMask};
use super::transport::{FeedbackHeader, TcpHeader, Transport, UdpHeader};

/// 2 字节协议 + 12 字节填充，凑成以太网帧头大小
pub const LINK_HEADER_LEN: usize = 14;

/// 组合头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub layers: LayerMask,
    pub mode: DecodeMode,
    /// 解码 ACK/NACK 时是否解析 INT 子头（TCP 总是解析）
    pub parse_telemetry: bool,
    /// 链路层协议标签
    pub link_proto: u16,
    pub ip: Ipv4Fields,
    pub transport: Transport,
}

impl Default for Header {
    fn default() -> Self {
        Self::new(LayerMask::default())
    }
}

impl Header {
    pub fn new(layers: LayerMask) -> Self {
        Self {
            layers,
            mode: DecodeMode::Brief,
            parse_telemetry: true,
            link_proto: 0,
            ip: Ipv4Fields::default(),
            transport: Transport::None,
        }
    }

    /// 设置传输层，同时同步网络层的协议号
    pub fn with_transport(mut self, transport: Transport) -> Self {
        if let Some(proto) = transport.protocol() {
            self.ip.protocol = proto;
        }
        self.transport = transport;
        self
    }

    pub fn tcp(layers: LayerMask, src: u32, dst: u32, tcp: TcpHeader) -> Self {
        let mut h = Self::new(layers).with_transport(Transport::Tcp(tcp));
        h.ip.src = src;
        h.ip.dst = dst;
        h
    }

    pub fn udp(layers: LayerMask, src: u32, dst: u32, udp: UdpHeader) -> Self {
        let mut h = Self::new(layers).with_transport(Transport::Udp(udp));
        h.ip.src = src;
        h.ip.dst = dst;
        h
    }

    pub fn feedback(layers: LayerMask, src: u32, dst: u32, fb: FeedbackHeader) -> Self {
        let mut h = Self::new(layers).with_transport(Transport::Feedback(fb));
        h.ip.src = src;
        h.ip.dst = dst;
        h
    }

    pub fn ecn(&self) -> u8 {
        self.ip.ecn()
    }

    /// 编码长度：只取决于层掩码和传输层变体（写出的协议号也由变体决定）
    pub fn serialized_size(&self) -> usize {
        let mut len = 0;
        if self.layers.contains(LayerMask::LINK) {
            len += LINK_HEADER_LEN;
        }
        if self.layers.contains(LayerMask::NETWORK) {
            len += super::ipv4::IPV4_HEADER_LEN;
        }
        if self.layers.contains(LayerMask::TRANSPORT) {
            len += self.transport.serialized_size();
        }
        len
    }

    /// 写入恰好 `serialized_size()` 个字节
    pub fn serialize(&self, buf: &mut impl BufMut) {
        if self.layers.contains(LayerMask::LINK) {
            buf.put_u16(self.link_proto);
            buf.put_u64(0);
            buf.put_u32(0);
        }
        if self.layers.contains(LayerMask::NETWORK) {
            // 协议号以传输层变体为准，保证解码时选中同一变体
            let mut ip = self.ip;
            if let Some(proto) = self.transport.protocol() {
                ip.protocol = proto;
            }
            ip.serialize(buf);
        }
        if self.layers.contains(LayerMask::TRANSPORT) {
            self.transport.serialize(buf);
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.serialized_size());
        self.serialize(&mut buf);
        buf.freeze()
    }

    /// 从 `start` 解码已启用的各层，返回消耗的总字节数。
    ///
    /// 每一层都从 `start` 按前面各层的长度重新定位，而不是依赖一次性的前向游标，
    /// 所以调用方可以只“窥视”包头。网络层版本不是 4（或数据不足）时返回 0；
    /// 未知协议号时传输层贡献 0 字节，网络层字段仍然有效。
    pub fn deserialize(&mut self, start: &[u8]) -> usize {
        let mut l2 = 0;
        if self.layers.contains(LayerMask::LINK) {
            if start.len() < LINK_HEADER_LEN {
                warn!(len = start.len(), "链路层数据不足，放弃解码");
                return 0;
            }
            let mut i = start;
            self.link_proto = i.get_u16();
            l2 = LINK_HEADER_LEN;
        }

        let mut l3 = 0;
        if self.layers.contains(LayerMask::NETWORK) {
            l3 = self.ip.decode(&start[l2..], self.mode);
            if l3 == 0 {
                return 0;
            }
        }

        let mut l4 = 0;
        if self.layers.contains(LayerMask::TRANSPORT) {
            let rest = start.get(l2 + l3..).unwrap_or(&[]);
            let (transport, n) =
                Transport::decode(self.ip.protocol, rest, self.mode, self.parse_telemetry);
            self.transport = transport;
            l4 = n;
        }

        trace!(l2, l3, l4, protocol = self.ip.protocol, "头解码完成");
        l2 + l3 + l4
    }
}
