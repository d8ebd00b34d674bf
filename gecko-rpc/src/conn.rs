use std::{
    fmt,
    sync::{PoisonError, RwLock},
};

use log::debug;
use tonic::transport::Channel;

/// 某个服务的长连接
///
/// 内部的 channel 可以被多个客户端克隆共享，关闭时只释放注册表持有的这一份，
/// 正在进行中的调用结束后底层连接随之关闭
pub struct Conn {
    service: String,
    channel: RwLock<Option<Channel>>,
}

impl Conn {
    pub fn new(service: impl Into<String>, channel: Channel) -> Self {
        Self {
            service: service.into(),
            channel: RwLock::new(Some(channel)),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// 已关闭时返回 None
    pub fn channel(&self) -> Option<Channel> {
        self.channel
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 关闭连接，可重复调用
    pub fn close(&self) {
        let channel = self
            .channel
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if channel.is_some() {
            debug!("close conn of service '{}'", self.service);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.channel
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl fmt::Debug for Conn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conn")
            .field("service", &self.service)
            .field("closed", &self.is_closed())
            .finish()
    }
}
