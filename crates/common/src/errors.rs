use thiserror::Error;

/// 统一错误类型
#[derive(Error, Debug)]
pub enum Error {
    /// 采集失败：目标不可达、超时或必填字段缺失
    #[error("采集错误: {0}")]
    Collection(String),

    /// 持久化层不可用，对当前请求是致命的
    #[error("存储错误: {0}")]
    Storage(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("资源已存在: {0}")]
    AlreadyExists(String),

    /// 操作被拒绝（例如删除本机）
    #[error("操作被拒绝: {0}")]
    Rejected(String),

    #[error("无效参数: {0}")]
    InvalidArgument(String),

    #[error("内部错误: {0}")]
    Internal(String),

    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// 是否为采集类错误（只影响实时数据部分）
    pub fn is_collection(&self) -> bool {
        matches!(self, Error::Collection(_))
    }
}

/// 统一结果类型
pub type Result<T> = std::result::Result<T, Error>;
