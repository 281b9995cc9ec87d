//! 场景描述（JSON）与两节点场景的搭建

mod runner;
mod spec;

pub use runner::{
    InjectFlow, PauseQueue, ResumeQueue, TakeDown, TwoNode, build_two_node, schedule_scenario,
};
pub use spec::{ConfigError, FlowProtocol, FlowSpec, PauseSpec, ScenarioSpec};
