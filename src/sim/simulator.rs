//! 仿真器
//!
//! 事件驱动仿真器：维护当前时间、事件堆，以及“仍然有效”的事件集合（用于取消）。

use super::event::{Event, EventId};
use super::time::SimTime;
use super::world::World;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use tracing::{debug, info, trace};

/// 堆中的一项。`seq` 同时是 `EventId`，保证同一时刻按调度顺序执行。
struct Pending {
    at: SimTime,
    seq: u64,
    ev: Box<dyn Event>,
}

// BinaryHeap 是 max-heap；我们需要最小时间优先，因此反向比较。
impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.at, other.seq).cmp(&(self.at, self.seq))
    }
}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for Pending {}

/// 事件驱动仿真器。
///
/// 取消是惰性的：被取消的事件仍留在堆里，出堆时发现不在 `live` 中就直接丢弃。
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    q: BinaryHeap<Pending>,
    live: HashMap<u64, SimTime>,
}

impl Simulator {
    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 调度事件在指定时间执行；早于 `now` 的时间会被拉到 `now`
    #[tracing::instrument(skip(self, ev), fields(event_type = std::any::type_name::<E>(), schedule_at = ?at))]
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) -> EventId {
        let at = at.max(self.now);
        let seq = self.next_seq;
        trace!(now = ?self.now, seq, "调度事件");

        self.next_seq = self.next_seq.wrapping_add(1);
        self.live.insert(seq, at);
        self.q.push(Pending {
            at,
            seq,
            ev: Box::new(ev),
        });

        debug!(queue_size = self.q.len(), "事件已加入队列");
        EventId(seq)
    }

    /// 在 `now + delay` 执行
    pub fn schedule_after<E: Event>(&mut self, delay: SimTime, ev: E) -> EventId {
        let at = self.now.saturating_add(delay);
        self.schedule(at, ev)
    }

    /// 取消一个尚未执行的事件；已执行或已取消时返回 false
    pub fn cancel(&mut self, id: EventId) -> bool {
        let cancelled = self.live.remove(&id.0).is_some();
        if cancelled {
            debug!(seq = id.0, "事件已取消");
        }
        cancelled
    }

    /// 事件仍待执行时返回其计划时间
    pub fn scheduled_at(&self, id: EventId) -> Option<SimTime> {
        self.live.get(&id.0).copied()
    }

    pub fn is_pending(&self, id: EventId) -> bool {
        self.live.contains_key(&id.0)
    }

    /// 待执行（未被取消）的事件数
    pub fn pending_events(&self) -> usize {
        self.live.len()
    }

    /// 弹出下一个有效事件；被取消的条目在这里被丢弃
    fn pop_live(&mut self) -> Option<Pending> {
        while let Some(item) = self.q.pop() {
            if self.live.remove(&item.seq).is_some() {
                return Some(item);
            }
            trace!(seq = item.seq, "跳过已取消事件");
        }
        None
    }

    /// 运行直到事件队列为空或到达 `until`。
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) {
        loop {
            match self.q.peek() {
                Some(top) if top.at <= until => {}
                _ => break,
            }
            let Some(item) = self.pop_live() else {
                break;
            };
            if item.at > until {
                // 取消的条目被跳过后，下一个有效事件可能已经越界：放回去
                self.live.insert(item.seq, item.at);
                self.q.push(item);
                break;
            }
            self.now = item.at;
            item.ev.execute(self, world);
            world.on_tick(self);
        }
        self.now = self.now.max(until);
    }

    /// 运行所有事件直到队列为空。
    #[tracing::instrument(skip(self, world))]
    pub fn run(&mut self, world: &mut dyn World) {
        info!("▶️  开始运行仿真");
        debug!(now = ?self.now, queue_size = self.q.len(), "初始状态");

        let mut event_count = 0;
        while let Some(item) = self.pop_live() {
            event_count += 1;
            self.now = item.at;

            debug!(
                event_num = event_count,
                now = ?self.now,
                seq = item.seq,
                remaining_queue = self.q.len(),
                "执行事件"
            );

            item.ev.execute(self, world);
            world.on_tick(self);
        }

        info!(
            total_events = event_count,
            final_time = ?self.now,
            "✅ 仿真完成"
        );
    }
}
