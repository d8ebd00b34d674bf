//! 派发层
//! 维护每个服务的长连接，并提供统一的调用入口：
//! 按服务名找到连接，用客户端工厂构造客户端，按方法名调用，
//! 调用过程中的任何故障（包括 panic）都转换成普通的错误返回

use std::{
    any::{type_name, Any},
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use futures::FutureExt;
use log::{debug, info, warn};

pub use setup::{SetupHandle, SetupReport};

use crate::{
    client::ClientFactory,
    config::{ClientConfig, Config, DialConfig},
    conn::Conn,
    context::CallContext,
    error::Error,
    registry::ConnRegistry,
    resolver::Resolver,
};

mod setup;

pub struct Dispatcher {
    /// key = 服务名
    conns: Arc<ConnRegistry<Conn>>,
    resolver: Arc<dyn Resolver>,
    dial: DialConfig,
    /// 关闭轮次，每次 close_service_conns 加一
    epoch: Arc<AtomicU64>,
}

impl Dispatcher {
    pub fn new<R: Resolver>(resolver: R) -> Self {
        Self::with_dial(resolver, DialConfig::default())
    }

    pub fn with_dial<R: Resolver>(resolver: R, dial: DialConfig) -> Self {
        Self {
            conns: Arc::new(ConnRegistry::new()),
            resolver: Arc::new(resolver),
            dial,
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::with_dial(cfg.resolver(), cfg.client.dial.clone())
    }

    pub fn registry(&self) -> &ConnRegistry<Conn> {
        &self.conns
    }

    /// 当前已登记连接的服务名
    pub fn services(&self) -> Vec<String> {
        self.conns.names()
    }

    pub fn start(&self, cfg: &ClientConfig) -> SetupHandle {
        self.start_service_conns(&cfg.address, &cfg.services)
    }

    /// 为每个服务并发地建立连接并登记，不等待完成
    /// * 建立失败只记录日志，该服务之后的调用会得到 not found
    /// * 返回的句柄可以丢弃，也可以用来等待全部就绪
    pub fn start_service_conns<S: AsRef<str>>(&self, address: &str, services: &[S]) -> SetupHandle {
        setup::spawn_all(self, address, services)
    }

    /// 关闭并移除全部连接，返回关闭的数量
    /// 此前启动、尚未完成的建立任务随之作废，不会再登记连接；之后可以重新 start
    pub fn close_service_conns(&self) -> usize {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let conns = self.conns.drain();
        for conn in conns.values() {
            conn.close();
        }
        info!("closed {} service conns", conns.len());
        conns.len()
    }

    pub fn close_service_conn(&self, service: &str) -> bool {
        match self.conns.remove(service) {
            Some(conn) => {
                conn.close();
                true
            }
            None => false,
        }
    }

    /// 通用调用入口
    /// * ctx: 调用上下文，原样传给远程方法
    /// * factory: 客户端工厂
    /// * service: 服务名
    /// * method: 方法名
    /// * req: 请求
    pub async fn call_rpc<C, Req, Resp>(
        &self,
        ctx: CallContext,
        factory: &ClientFactory<C>,
        service: &str,
        method: &str,
        req: Req,
    ) -> Result<Resp, Error>
    where
        C: Send + 'static,
        Req: Send + 'static,
        Resp: Send + 'static,
    {
        // 已关闭的连接视同不存在，不会临时拨号
        let channel = self
            .conns
            .get(service)
            .and_then(|conn| conn.channel())
            .ok_or_else(|| Error::ConnNotFound {
                service: service.to_string(),
            })?;

        let call = async {
            let client = factory.build(channel);
            factory.invoke(client, method, ctx, Box::new(req)).await
        };
        let resp = match AssertUnwindSafe(call).catch_unwind().await {
            Ok(resp) => resp?,
            Err(panic) => {
                let detail = panic_detail(panic.as_ref());
                warn!("call RPC '{}' on '{}' panicked: {}", method, service, detail);
                return Err(Error::dispatch(method, detail));
            }
        };
        debug!("call RPC '{}' on '{}' done", method, service);

        resp.downcast::<Resp>().map(|resp| *resp).map_err(|_| {
            Error::dispatch(
                method,
                format!("response type mismatch, expected {}", type_name::<Resp>()),
            )
        })
    }
}

fn panic_detail(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
