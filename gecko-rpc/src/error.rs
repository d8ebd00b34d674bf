use tokio::{io, task::JoinError};

/// 错误所属的大类，调用方据此区分本地失败与远程失败
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 服务名没有可用连接
    NotFound,
    /// 动态派发过程中出现的故障
    Dispatch,
    /// 远程方法返回的业务错误
    Remote,
    /// 连接建立阶段的失败，只记录日志，不会从调用路径返回
    Setup,
    /// 配置加载失败
    Config,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Service conn '{service}' not found")]
    ConnNotFound { service: String },
    #[error("Call RPC '{method}' error: {detail}")]
    Dispatch { method: String, detail: String },
    #[error("Remote call error: {0}")]
    Remote(#[from] tonic::Status),
    #[error("Resolve service '{service}' error: {message}")]
    Resolve { service: String, message: String },
    #[error("Setup of '{service}' cancelled by shutdown")]
    Cancelled { service: String },
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
    #[error("Setup task error: {0}")]
    Join(#[from] JoinError),
    #[error("I/O: {0}")]
    Io(#[from] io::Error),
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ConnNotFound { .. } => ErrorKind::NotFound,
            Error::Dispatch { .. } => ErrorKind::Dispatch,
            Error::Remote(_) => ErrorKind::Remote,
            Error::Resolve { .. }
            | Error::Cancelled { .. }
            | Error::Transport(_)
            | Error::Join(_) => ErrorKind::Setup,
            Error::Io(_) | Error::Config(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn dispatch(method: &str, detail: impl Into<String>) -> Self {
        Error::Dispatch {
            method: method.to_string(),
            detail: detail.into(),
        }
    }
}
