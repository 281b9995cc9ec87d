use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::device::DeviceConfig;
use crate::net::ChannelConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scenario json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid scenario: {0}")]
    Invalid(String),
}

/// 两块网卡 + 一条信道的场景描述（JSON）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioSpec {
    /// 发送端网卡
    pub sender: DeviceConfig,
    /// 接收端网卡
    pub receiver: DeviceConfig,
    pub channel: ChannelConfig,
    pub flows: Vec<FlowSpec>,
    pub pauses: Vec<PauseSpec>,
    /// 在该时刻关闭发送端网卡
    pub take_down_at_ns: Option<u64>,
    pub until_ns: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowProtocol {
    #[default]
    Tcp,
    Udp,
    Ack,
    Nack,
}

/// 从发送端某个优先级队列注入的一串 packet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowSpec {
    pub queue: usize,
    pub count: u64,
    pub pkt_bytes: u32,
    pub protocol: FlowProtocol,
    pub start_ns: u64,
    pub gap_ns: u64,
    pub tos: u8,
}

impl Default for FlowSpec {
    fn default() -> Self {
        Self {
            queue: 0,
            count: 1,
            pkt_bytes: 1500,
            protocol: FlowProtocol::Tcp,
            start_ns: 0,
            gap_ns: 0,
            tos: 0,
        }
    }
}

/// 发送端某个队列在 `pause_at_ns` 暂停，可选地在 `resume_at_ns` 恢复
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PauseSpec {
    pub queue: usize,
    #[serde(default)]
    pub pause_at_ns: u64,
    #[serde(default)]
    pub resume_at_ns: Option<u64>,
}

impl ScenarioSpec {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let spec: ScenarioSpec = serde_json::from_str(raw)?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, dev) in [("sender", &self.sender), ("receiver", &self.receiver)] {
            if dev.data_rate_bps == 0 {
                return Err(ConfigError::Invalid(format!("{name}.data_rate_bps must be > 0")));
            }
            if dev.queue_count == 0 {
                return Err(ConfigError::Invalid(format!("{name}.queue_count must be > 0")));
            }
        }
        let qcnt = self.sender.queue_count;
        for (i, f) in self.flows.iter().enumerate() {
            if f.queue >= qcnt {
                return Err(ConfigError::Invalid(format!(
                    "flows[{i}].queue={} out of range (queue_count={qcnt})",
                    f.queue
                )));
            }
            if f.pkt_bytes == 0 {
                return Err(ConfigError::Invalid(format!("flows[{i}].pkt_bytes must be > 0")));
            }
        }
        for (i, p) in self.pauses.iter().enumerate() {
            if p.queue >= qcnt {
                return Err(ConfigError::Invalid(format!(
                    "pauses[{i}].queue={} out of range (queue_count={qcnt})",
                    p.queue
                )));
            }
            if p.resume_at_ns.is_some_and(|r| r < p.pause_at_ns) {
                return Err(ConfigError::Invalid(format!(
                    "pauses[{i}] resumes before it pauses"
                )));
            }
            // 同一队列的多个暂停窗口会让恢复落在未暂停的队列上
            if self.pauses[..i].iter().any(|q| q.queue == p.queue) {
                return Err(ConfigError::Invalid(format!(
                    "pauses[{i}].queue={} appears more than once",
                    p.queue
                )));
            }
        }
        Ok(())
    }
}
