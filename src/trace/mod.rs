//! 观测事件记录
//!
//! 入队/出队/丢包/开始发送/发送结束/信道传输/接收等钩子以结构化 JSON 事件
//! 的形式收集，仿真结束后可一次性写出。

mod types;

pub use types::{
    DropReason, TraceChannelInfo, TraceDeviceInfo, TraceEvent, TraceEventKind, TraceLogger,
};
