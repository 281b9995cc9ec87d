//! 出口队列
//!
//! 每个优先级一个 FIFO，外加暂停位图和轮询/严格优先级选择。

mod egress;
mod fifo;

pub use egress::{DEFAULT_QUEUE_COUNT, EgressQueueSet, SelectionPolicy};
pub use fifo::FifoQueue;
