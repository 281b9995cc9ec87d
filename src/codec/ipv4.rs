//! IPv4 形状的网络层
//!
//! 两种解码模式：
//! - Brief：只读 tos / id / protocol / 地址，头长固定 20 字节
//! - Full：还原全部字段（长度、分片标志与偏移、ttl、校验和）

use bytes::{Buf, BufMut};
use tracing::warn;

use super::layers::DecodeMode;

/// 不带选项的 IPv4 头长
pub const IPV4_HEADER_LEN: usize = 20;

const VER_IHL: u8 = (4 << 4) | 5;
const DF_BIT: u8 = 1 << 6;
const MF_BIT: u8 = 1 << 5;

/// 分片标志
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FragmentFlags {
    pub dont_fragment: bool,
    pub more_fragments: bool,
}

/// 网络层字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Fields {
    /// 低 2 位为 ECN
    pub tos: u8,
    /// 载荷长度；线上写的是 `payload_size + 20`
    pub payload_size: u16,
    pub id: u16,
    pub flags: FragmentFlags,
    /// 字节偏移（8 的倍数），线上是 13 bit 的 8 字节单位
    pub fragment_offset: u16,
    pub ttl: u8,
    /// 下一层协议号，决定传输层变体
    pub protocol: u8,
    /// 只在 Full 解码时读回；编码总写 0
    pub checksum: u16,
    pub src: u32,
    pub dst: u32,
    /// 本头记录的头长，下一层从这里开始解码
    pub header_size: u16,
}

impl Default for Ipv4Fields {
    fn default() -> Self {
        Self {
            tos: 0,
            payload_size: 0,
            id: 0,
            flags: FragmentFlags::default(),
            fragment_offset: 0,
            ttl: 0,
            protocol: 0,
            checksum: 0,
            src: 0,
            dst: 0,
            header_size: IPV4_HEADER_LEN as u16,
        }
    }
}

impl Ipv4Fields {
    pub fn ecn(&self) -> u8 {
        self.tos & 0x3
    }

    pub fn set_ecn(&mut self, ecn: u8) {
        self.tos = (self.tos & !0x3) | (ecn & 0x3);
    }

    /// DSCP（tos 高 6 位）
    pub fn dscp(&self) -> u8 {
        self.tos >> 2
    }

    pub fn serialize(&self, buf: &mut impl BufMut) {
        buf.put_u8(VER_IHL);
        buf.put_u8(self.tos);
        buf.put_u16(self.payload_size.wrapping_add(IPV4_HEADER_LEN as u16));
        buf.put_u16(self.id);

        let frag = self.fragment_offset / 8;
        let mut flags_frag = ((frag >> 8) & 0x1f) as u8;
        if self.flags.dont_fragment {
            flags_frag |= DF_BIT;
        }
        if self.flags.more_fragments {
            flags_frag |= MF_BIT;
        }
        buf.put_u8(flags_frag);
        buf.put_u8((frag & 0xff) as u8);

        buf.put_u8(self.ttl);
        buf.put_u8(self.protocol);
        buf.put_u16(0);
        buf.put_u32(self.src);
        buf.put_u32(self.dst);
    }

    /// 从网络层起点解码，返回本层长度；版本不是 4 或数据不足时返回 0
    pub(crate) fn decode(&mut self, start: &[u8], mode: DecodeMode) -> usize {
        if start.len() < IPV4_HEADER_LEN {
            warn!(len = start.len(), "网络层数据不足 20 字节，放弃解码");
            return 0;
        }
        let mut i = start;
        let ver_ihl = i.get_u8();
        let header_size = (ver_ihl & 0x0f) as u16 * 4;

        if ver_ihl >> 4 != 4 {
            warn!(ver_ihl, "Trying to decode a non-IPv4 header, refusing to do it");
            return 0;
        }

        match mode {
            DecodeMode::Brief => {
                self.tos = i.get_u8();
                i.advance(2);
                self.id = i.get_u16();
                i.advance(3);
                self.protocol = i.get_u8();
                i.advance(2);
                self.src = i.get_u32();
                self.dst = i.get_u32();
                self.header_size = IPV4_HEADER_LEN as u16;
                IPV4_HEADER_LEN
            }
            DecodeMode::Full => {
                if (header_size as usize) < IPV4_HEADER_LEN {
                    warn!(header_size, "IHL 小于 5，放弃解码");
                    return 0;
                }
                if start.len() < header_size as usize {
                    warn!(header_size, len = start.len(), "IHL 超出缓冲区，放弃解码");
                    return 0;
                }
                self.tos = i.get_u8();
                let total = i.get_u16();
                self.payload_size = total.wrapping_sub(header_size);
                self.id = i.get_u16();

                // 先读标志字节，再退回一个字节把低 5 位与下一字节拼成偏移
                let flags_at = i;
                let flags = i.get_u8();
                self.flags = FragmentFlags {
                    dont_fragment: flags & DF_BIT != 0,
                    more_fragments: flags & MF_BIT != 0,
                };
                i = flags_at;
                let mut offset = (i.get_u8() & 0x1f) as u16;
                offset <<= 8;
                offset |= i.get_u8() as u16;
                offset <<= 3;
                self.fragment_offset = offset;

                self.ttl = i.get_u8();
                self.protocol = i.get_u8();
                self.checksum = i.get_u16_le();
                self.src = i.get_u32();
                self.dst = i.get_u32();
                self.header_size = header_size;
                header_size as usize
            }
        }
    }
}
