//! 接收侧错误模型
//!
//! 只回答“这个 packet 是否损坏”，损坏的 packet 在解码前就被丢弃。

use std::collections::HashSet;

use super::packet::Packet;

pub trait ErrorModel: Send {
    fn is_corrupt(&mut self, pkt: &Packet) -> bool;
}

impl<F> ErrorModel for F
where
    F: FnMut(&Packet) -> bool + Send,
{
    fn is_corrupt(&mut self, pkt: &Packet) -> bool {
        self(pkt)
    }
}

/// 按 packet id 列表判定损坏
#[derive(Debug, Clone, Default)]
pub struct ListErrorModel {
    ids: HashSet<u64>,
}

impl ListErrorModel {
    pub fn new(ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }
}

impl ErrorModel for ListErrorModel {
    fn is_corrupt(&mut self, pkt: &Packet) -> bool {
        self.ids.contains(&pkt.id)
    }
}
