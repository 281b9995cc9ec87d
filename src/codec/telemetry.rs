//! 带内遥测（INT）子头
//!
//! 固定 36 字节：`nhop`(u16) + 保留(u16) + 4 个 8 字节的 hop 记录。
//! 与 ACK/NACK 字段一样使用主机字节序（小端），只在仿真内部流转。

use bytes::{Buf, BufMut};

/// 最多记录的跳数
pub const MAX_HOPS: usize = 4;

/// 一个 hop 记录：按位打包的 64 bit。
///
/// | bits   | 字段                       |
/// |--------|----------------------------|
/// | 0..3   | 线速索引（见 [`LINE_RATES`]）|
/// | 3..27  | 时间戳（ns，取低 24 位）     |
/// | 27..47 | 已发送字节（128B 为单位）    |
/// | 47..64 | 队列长度（80B 为单位）       |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntHop(u64);

/// 可编码的线速（bps），按索引存放
pub const LINE_RATES: [u64; 8] = [
    10_000_000_000,
    25_000_000_000,
    40_000_000_000,
    50_000_000_000,
    100_000_000_000,
    200_000_000_000,
    400_000_000_000,
    800_000_000_000,
];

const RATE_BITS: u32 = 3;
const TIME_BITS: u32 = 24;
const BYTES_BITS: u32 = 20;
const QLEN_BITS: u32 = 17;

const TIME_SHIFT: u32 = RATE_BITS;
const BYTES_SHIFT: u32 = TIME_SHIFT + TIME_BITS;
const QLEN_SHIFT: u32 = BYTES_SHIFT + BYTES_BITS;

pub const BYTE_UNIT: u64 = 128;
pub const QLEN_UNIT: u64 = 80;

const fn mask(bits: u32) -> u64 {
    (1u64 << bits) - 1
}

impl IntHop {
    pub const LEN: usize = 8;

    /// 打包一个 hop。超出位宽的值会被截断（时间戳本来就是回绕计数）。
    pub fn new(line_rate_bps: u64, time_ns: u64, tx_bytes: u64, qlen_bytes: u64) -> Self {
        let rate = rate_index(line_rate_bps) as u64;
        let time = time_ns & mask(TIME_BITS);
        let bytes = (tx_bytes / BYTE_UNIT) & mask(BYTES_BITS);
        let qlen = (qlen_bytes / QLEN_UNIT) & mask(QLEN_BITS);
        IntHop(rate | time << TIME_SHIFT | bytes << BYTES_SHIFT | qlen << QLEN_SHIFT)
    }

    pub fn from_raw(raw: u64) -> Self {
        IntHop(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn line_rate_bps(self) -> u64 {
        LINE_RATES[(self.0 & mask(RATE_BITS)) as usize]
    }

    pub fn time(self) -> u64 {
        (self.0 >> TIME_SHIFT) & mask(TIME_BITS)
    }

    pub fn bytes(self) -> u64 {
        ((self.0 >> BYTES_SHIFT) & mask(BYTES_BITS)) * BYTE_UNIT
    }

    pub fn qlen(self) -> u64 {
        ((self.0 >> QLEN_SHIFT) & mask(QLEN_BITS)) * QLEN_UNIT
    }
}

/// 精确匹配优先；否则取不超过 `bps` 的最大档位（过小则为 0 档）
fn rate_index(bps: u64) -> u8 {
    LINE_RATES
        .iter()
        .rposition(|&r| r <= bps)
        .unwrap_or(0) as u8
}

/// INT 子头
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntHeader {
    nhop: u16,
    hops: [IntHop; MAX_HOPS],
}

impl IntHeader {
    pub const LEN: usize = 4 + MAX_HOPS * IntHop::LEN;

    /// 追加一跳；已满时返回 false，记录保持不变
    pub fn push_hop(&mut self, hop: IntHop) -> bool {
        let n = self.nhop as usize;
        if n >= MAX_HOPS {
            return false;
        }
        self.hops[n] = hop;
        self.nhop += 1;
        true
    }

    pub fn nhop(&self) -> usize {
        self.nhop as usize
    }

    /// 有效的 hop 记录
    pub fn hops(&self) -> &[IntHop] {
        &self.hops[..self.nhop()]
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub const fn serialized_size(&self) -> usize {
        Self::LEN
    }

    pub fn serialize(&self, buf: &mut impl BufMut) {
        buf.put_u16_le(self.nhop);
        buf.put_u16_le(0);
        for hop in &self.hops {
            buf.put_u32_le(hop.0 as u32);
            buf.put_u32_le((hop.0 >> 32) as u32);
        }
    }

    /// 返回消耗的字节数；剩余不足一个完整子头时返回 0 且不修改自身
    pub fn deserialize(&mut self, buf: &mut impl Buf) -> usize {
        if buf.remaining() < Self::LEN {
            return 0;
        }
        let nhop = buf.get_u16_le();
        buf.advance(2);
        for hop in &mut self.hops {
            let lo = buf.get_u32_le() as u64;
            let hi = buf.get_u32_le() as u64;
            *hop = IntHop(hi << 32 | lo);
        }
        self.nhop = nhop.min(MAX_HOPS as u16);
        Self::LEN
    }
}
