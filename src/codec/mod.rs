//! 包头编解码
//!
//! 把链路/网络/传输三层（含 INT 遥测与 ACK/NACK 反馈）直接编码到字节缓冲区，
//! 或从中解码出来。

mod header;
mod ipv4;
mod layers;
mod telemetry;
mod transport;

pub use header::{Header, LINK_HEADER_LEN};
pub use ipv4::{FragmentFlags, IPV4_HEADER_LEN, Ipv4Fields};
pub use layers::{DecodeMode, LayerMask};
pub use telemetry::{BYTE_UNIT, IntHeader, IntHop, LINE_RATES, MAX_HOPS, QLEN_UNIT};
pub use transport::{
    FeedbackHeader, FeedbackKind, PROTO_ACK, PROTO_NACK, PROTO_TCP, PROTO_UDP, TcpHeader,
    Transport, UdpHeader,
};
