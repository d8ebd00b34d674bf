use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use futures::future::join_all;
use log::{error, info};
use tokio::task::JoinHandle;
use tonic::transport::Channel;

use super::Dispatcher;
use crate::{
    config::DialConfig, conn::Conn, error::Error, registry::ConnRegistry, resolver::Resolver,
};

/// 连接建立任务的句柄
///
/// 直接丢弃即为“发出去不管”，任务照常在后台运行；
/// 需要确认连接就绪的调用方可以 `wait`
#[derive(Debug)]
pub struct SetupHandle {
    tasks: Vec<(String, JoinHandle<Result<(), Error>>)>,
}

/// 每个服务的建立结果
#[derive(Debug, Default)]
pub struct SetupReport {
    pub ready: Vec<String>,
    pub failed: Vec<(String, Error)>,
}

impl SetupHandle {
    pub fn services(&self) -> Vec<&str> {
        self.tasks.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// 等待全部任务结束
    pub async fn wait(self) -> SetupReport {
        let (names, tasks): (Vec<String>, Vec<_>) = self.tasks.into_iter().unzip();
        let mut report = SetupReport::default();
        for (name, result) in names.into_iter().zip(join_all(tasks).await) {
            match result {
                Ok(Ok(())) => report.ready.push(name),
                Ok(Err(e)) => report.failed.push((name, e)),
                Err(e) => report.failed.push((name, e.into())),
            }
        }
        report
    }
}

impl SetupReport {
    pub fn is_all_ready(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn error(&self, service: &str) -> Option<&Error> {
        self.failed
            .iter()
            .find(|(name, _)| name == service)
            .map(|(_, e)| e)
    }
}

/// 为每个服务启动一个独立的建立任务，必须在 tokio 运行时内调用
///
/// 任务启动时记下关闭轮次，轮次在任务结束前变化说明中途执行过关闭，
/// 新建的连接直接关掉，不留在注册表里
pub(super) fn spawn_all<S: AsRef<str>>(
    dispatcher: &Dispatcher,
    address: &str,
    services: &[S],
) -> SetupHandle {
    let epoch = dispatcher.epoch.load(Ordering::SeqCst);
    let tasks = services
        .iter()
        .map(|name| {
            let name = name.as_ref().to_string();
            let task = tokio::spawn(setup_conn(
                dispatcher.conns.clone(),
                dispatcher.resolver.clone(),
                dispatcher.dial.clone(),
                dispatcher.epoch.clone(),
                epoch,
                address.to_string(),
                name.clone(),
            ));
            (name, task)
        })
        .collect();
    SetupHandle { tasks }
}

async fn setup_conn(
    conns: Arc<ConnRegistry<Conn>>,
    resolver: Arc<dyn Resolver>,
    dial: DialConfig,
    current_epoch: Arc<AtomicU64>,
    epoch: u64,
    address: String,
    service: String,
) -> Result<(), Error> {
    let cancelled = || current_epoch.load(Ordering::SeqCst) != epoch;
    // 失败时只移除启动时登记的那个连接，期间别的任务新登记的连接不动
    let previous = conns.get(&service);

    let conn = match connect(resolver.as_ref(), &dial, &address, &service).await {
        Ok(conn) => Arc::new(conn),
        Err(e) => {
            error!("connect to '{}' service failed: {}", service, e);
            // 等价于登记一个空连接：之后的调用会得到 not found
            if let Some(old) = previous {
                if conns.remove_if_same(&service, &old) {
                    old.close();
                }
            }
            return Err(e);
        }
    };

    if cancelled() {
        conn.close();
        return Err(Error::Cancelled { service });
    }
    if let Some(old) = conns.replace(&service, conn.clone()) {
        old.close();
    }
    // 关闭先推进轮次再清空注册表，这里再检查一次就不会漏掉
    if cancelled() {
        conns.remove_if_same(&service, &conn);
        conn.close();
        return Err(Error::Cancelled { service });
    }
    info!("connect to '{}' service at {}", service, address);
    Ok(())
}

async fn connect(
    resolver: &dyn Resolver,
    dial: &DialConfig,
    address: &str,
    service: &str,
) -> Result<Conn, Error> {
    let targets = resolver.resolve(address, service).await?;
    if targets.is_empty() {
        return Err(Error::Resolve {
            service: service.to_string(),
            message: "no targets".to_string(),
        });
    }
    let endpoints = targets
        .into_iter()
        .map(|target| dial.endpoint(target))
        .collect::<Result<Vec<_>, _>>()?;
    // 客户端负载均衡，连接惰性建立
    let channel = Channel::balance_list(endpoints.into_iter());
    Ok(Conn::new(service, channel))
}
