//! 传输层变体
//!
//! 由网络层的协议号选择：TCP(6) / UDP(17) / 拥塞反馈 ACK(0xFC)、NACK(0xFD)。
//!
//! 字节序不对称是有意保留的：TCP/UDP 字段用网络字节序，ACK/NACK 字段（以及
//! INT 子头）用主机字节序（小端）。后者只在仿真内部使用，下游拥塞控制逻辑
//! 可能依赖这一约定，所以不要“修正”。

use bytes::{Buf, BufMut};
use tracing::warn;

use super::layers::DecodeMode;
use super::telemetry::IntHeader;

pub const PROTO_TCP: u8 = 0x06;
pub const PROTO_UDP: u8 = 0x11;
pub const PROTO_ACK: u8 = 0xFC;
pub const PROTO_NACK: u8 = 0xFD;

/// TCP 头 + INT 序号/路径组 + INT 子头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpHeader {
    pub sport: u16,
    pub dport: u16,
    pub seq: u32,
    pub ack: u32,
    /// 数据偏移（32 bit 字为单位，4 bit）
    pub data_offset: u8,
    /// 6 bit 标志
    pub flags: u8,
    pub window: u16,
    pub urgent: u16,
    /// INT 序号
    pub int_seq: u32,
    /// INT 路径/分组 id
    pub int_pg: u16,
    pub int: IntHeader,
}

impl Default for TcpHeader {
    fn default() -> Self {
        Self {
            sport: 0,
            dport: 0,
            seq: 0,
            ack: 0,
            data_offset: 5,
            flags: 0,
            window: 0,
            urgent: 0,
            int_seq: 0,
            int_pg: 0,
            int: IntHeader::default(),
        }
    }
}

impl TcpHeader {
    pub const BASE_LEN: usize = 20;
    /// `int_seq` + `int_pg`
    pub const INT_PREFIX_LEN: usize = 6;
    pub const LEN: usize = Self::BASE_LEN + Self::INT_PREFIX_LEN + IntHeader::LEN;

    fn serialize(&self, buf: &mut impl BufMut) {
        buf.put_u16(self.sport);
        buf.put_u16(self.dport);
        buf.put_u32(self.seq);
        buf.put_u32(self.ack);
        // 保留位全 0
        buf.put_u16((self.data_offset as u16) << 12 | (self.flags & 0x3f) as u16);
        buf.put_u16(self.window);
        buf.put_u16(0);
        buf.put_u16(self.urgent);
        buf.put_u32(self.int_seq);
        buf.put_u16(self.int_pg);
        self.int.serialize(buf);
    }

    fn decode(mut i: &[u8]) -> Option<(Self, usize)> {
        if i.len() < Self::LEN {
            return None;
        }
        let mut tcp = TcpHeader {
            sport: i.get_u16(),
            dport: i.get_u16(),
            seq: i.get_u32(),
            ack: i.get_u32(),
            ..TcpHeader::default()
        };
        let field = i.get_u16();
        tcp.flags = (field & 0x3f) as u8;
        tcp.data_offset = (field >> 12) as u8;
        tcp.window = i.get_u16();
        i.advance(2);
        tcp.urgent = i.get_u16();

        tcp.int_seq = i.get_u32();
        tcp.int_pg = i.get_u16();
        let n = tcp.int.deserialize(&mut i);
        Some((tcp, Self::BASE_LEN + Self::INT_PREFIX_LEN + n))
    }
}

/// UDP 头（校验和位置写 0）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UdpHeader {
    pub sport: u16,
    pub dport: u16,
    /// 只在 Full 模式读回
    pub payload_size: u16,
}

impl UdpHeader {
    pub const LEN: usize = 8;

    fn serialize(&self, buf: &mut impl BufMut) {
        buf.put_u16(self.sport);
        buf.put_u16(self.dport);
        buf.put_u16(self.payload_size);
        buf.put_u16(0);
    }

    fn decode(mut i: &[u8], mode: DecodeMode) -> Option<(Self, usize)> {
        if i.len() < Self::LEN {
            return None;
        }
        let mut udp = UdpHeader {
            sport: i.get_u16(),
            dport: i.get_u16(),
            payload_size: 0,
        };
        match mode {
            DecodeMode::Brief => i.advance(4),
            DecodeMode::Full => {
                udp.payload_size = i.get_u16();
                i.advance(2);
            }
        }
        Some((udp, Self::LEN))
    }
}

/// ACK 还是 NACK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedbackKind {
    #[default]
    Ack,
    Nack,
}

impl FeedbackKind {
    pub fn protocol(self) -> u8 {
        match self {
            FeedbackKind::Ack => PROTO_ACK,
            FeedbackKind::Nack => PROTO_NACK,
        }
    }
}

/// 拥塞反馈（ACK/NACK），字段为主机字节序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeedbackHeader {
    pub kind: FeedbackKind,
    pub sport: u16,
    pub dport: u16,
    pub flags: u16,
    /// 路径/分组 id
    pub pg: u16,
    /// 被确认的序号
    pub seq: u32,
    pub int: IntHeader,
}

impl FeedbackHeader {
    pub const BASE_LEN: usize = 12;

    fn serialize(&self, buf: &mut impl BufMut) {
        buf.put_u16_le(self.sport);
        buf.put_u16_le(self.dport);
        buf.put_u16_le(self.flags);
        buf.put_u16_le(self.pg);
        buf.put_u32_le(self.seq);
        self.int.serialize(buf);
    }

    fn decode(mut i: &[u8], kind: FeedbackKind, parse_telemetry: bool) -> Option<(Self, usize)> {
        let need = if parse_telemetry {
            Self::BASE_LEN + IntHeader::LEN
        } else {
            Self::BASE_LEN
        };
        if i.len() < need {
            return None;
        }
        let mut fb = FeedbackHeader {
            kind,
            sport: i.get_u16_le(),
            dport: i.get_u16_le(),
            flags: i.get_u16_le(),
            pg: i.get_u16_le(),
            seq: i.get_u32_le(),
            int: IntHeader::default(),
        };
        let mut len = Self::BASE_LEN;
        if parse_telemetry {
            len += fb.int.deserialize(&mut i);
        }
        Some((fb, len))
    }
}

/// 传输层：按协议号区分的和类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// 未解析/未知协议
    #[default]
    None,
    Tcp(TcpHeader),
    Udp(UdpHeader),
    Feedback(FeedbackHeader),
}

impl Transport {
    /// 本变体对应的协议号
    pub fn protocol(&self) -> Option<u8> {
        match self {
            Transport::None => None,
            Transport::Tcp(_) => Some(PROTO_TCP),
            Transport::Udp(_) => Some(PROTO_UDP),
            Transport::Feedback(fb) => Some(fb.kind.protocol()),
        }
    }

    /// 携带 INT 子头的变体（TCP、ACK/NACK）
    pub fn int(&self) -> Option<&IntHeader> {
        match self {
            Transport::Tcp(tcp) => Some(&tcp.int),
            Transport::Feedback(fb) => Some(&fb.int),
            _ => None,
        }
    }

    pub fn int_mut(&mut self) -> Option<&mut IntHeader> {
        match self {
            Transport::Tcp(tcp) => Some(&mut tcp.int),
            Transport::Feedback(fb) => Some(&mut fb.int),
            _ => None,
        }
    }

    pub fn serialized_size(&self) -> usize {
        match self {
            Transport::None => 0,
            Transport::Tcp(_) => TcpHeader::LEN,
            Transport::Udp(_) => UdpHeader::LEN,
            Transport::Feedback(fb) => FeedbackHeader::BASE_LEN + fb.int.serialized_size(),
        }
    }

    pub fn serialize(&self, buf: &mut impl BufMut) {
        match self {
            Transport::None => {}
            Transport::Tcp(tcp) => tcp.serialize(buf),
            Transport::Udp(udp) => udp.serialize(buf),
            Transport::Feedback(fb) => fb.serialize(buf),
        }
    }

    /// 按协议号解码传输层。未知协议或数据不足时返回 `(None, 0)`。
    pub(crate) fn decode(
        protocol: u8,
        start: &[u8],
        mode: DecodeMode,
        parse_telemetry: bool,
    ) -> (Transport, usize) {
        let decoded = match protocol {
            PROTO_TCP => TcpHeader::decode(start).map(|(h, n)| (Transport::Tcp(h), n)),
            PROTO_UDP => UdpHeader::decode(start, mode).map(|(h, n)| (Transport::Udp(h), n)),
            PROTO_ACK => FeedbackHeader::decode(start, FeedbackKind::Ack, parse_telemetry)
                .map(|(h, n)| (Transport::Feedback(h), n)),
            PROTO_NACK => FeedbackHeader::decode(start, FeedbackKind::Nack, parse_telemetry)
                .map(|(h, n)| (Transport::Feedback(h), n)),
            _ => return (Transport::None, 0),
        };
        decoded.unwrap_or_else(|| {
            warn!(protocol, len = start.len(), "传输层数据不足，跳过");
            (Transport::None, 0)
        })
    }
}
