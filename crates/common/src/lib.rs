/// Metricly - 公共库
///
/// 提供 Server 与对端主机共享的指标模型、错误处理、单位换算等

pub mod errors;
pub mod models;
pub mod utils;

// 重新导出常用类型
pub use errors::{Error, Result};
pub use models::{HostAddr, MetricKind};
