use std::{collections::HashMap, time::Duration};

use tokio::{fs, io::AsyncReadExt};
use tonic::transport::Endpoint;

use crate::{error::Error, resolver::StaticResolver};

#[derive(Debug, serde::Deserialize)]
pub struct Config {
    pub client: ClientConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ClientConfig {
    /// 拨号地址
    pub address: String,
    /// 启动时需要建立连接的服务
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(flatten)]
    pub dial: DialConfig,
}

/// 建立 endpoint 时使用的参数，时间单位都是秒
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct DialConfig {
    #[serde(default)]
    pub connect_timeout: Option<u64>,
    #[serde(default)]
    pub request_timeout: Option<u64>,
    #[serde(default)]
    pub tcp_keepalive: Option<u64>,
    #[serde(default)]
    pub concurrency_limit: Option<usize>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ResolverConfig {
    #[serde(default)]
    pub strict: bool,
    /// key = 服务名，value = 目标地址列表
    #[serde(default)]
    pub targets: HashMap<String, Vec<String>>,
}

impl Config {
    pub async fn from_path(path: &str) -> Result<Self, Error> {
        let mut file = fs::File::open(path).await?;
        let mut s = String::new();
        file.read_to_string(&mut s).await?;

        Self::parse(&s)
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        Ok(toml::from_str::<Config>(s)?)
    }

    pub fn resolver(&self) -> StaticResolver {
        StaticResolver::new(self.resolver.targets.clone()).strict(self.resolver.strict)
    }
}

impl DialConfig {
    /// 按配置构造一个 endpoint，只做解析，不会发起连接
    pub fn endpoint(&self, target: String) -> Result<Endpoint, Error> {
        let mut endpoint = Endpoint::from_shared(target)?;
        if let Some(secs) = self.connect_timeout {
            endpoint = endpoint.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.request_timeout {
            endpoint = endpoint.timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.tcp_keepalive {
            endpoint = endpoint.tcp_keepalive(Some(Duration::from_secs(secs)));
        }
        if let Some(limit) = self.concurrency_limit {
            endpoint = endpoint.concurrency_limit(limit);
        }
        Ok(endpoint)
    }
}
