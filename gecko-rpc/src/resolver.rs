//! 服务名解析
//! 把服务名解析成一组目标地址，交给客户端负载均衡使用。
//! 解析本身属于外部服务发现，这里只提供两种简单实现：
//! * 直连：所有服务都指向拨号地址本身
//! * 静态表：从配置文件读取每个服务的地址列表

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Error;

#[async_trait]
pub trait Resolver: Send + Sync + 'static {
    /// 解析服务名，返回目标地址列表
    async fn resolve(&self, address: &str, service: &str) -> Result<Vec<String>, Error>;
}

pub struct DirectResolver;

#[async_trait]
impl Resolver for DirectResolver {
    async fn resolve(&self, address: &str, _service: &str) -> Result<Vec<String>, Error> {
        Ok(vec![address.to_string()])
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    targets: HashMap<String, Vec<String>>,
    /// 为 true 时，表中没有的服务解析失败，而不是回退到拨号地址
    strict: bool,
}

impl StaticResolver {
    pub fn new(targets: HashMap<String, Vec<String>>) -> Self {
        Self {
            targets,
            strict: false,
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

#[async_trait]
impl Resolver for StaticResolver {
    async fn resolve(&self, address: &str, service: &str) -> Result<Vec<String>, Error> {
        match self.targets.get(service) {
            Some(targets) if !targets.is_empty() => Ok(targets.clone()),
            Some(_) => Err(Error::Resolve {
                service: service.to_string(),
                message: "empty target list".to_string(),
            }),
            None if self.strict => Err(Error::Resolve {
                service: service.to_string(),
                message: "service not in resolver table".to_string(),
            }),
            None => Ok(vec![address.to_string()]),
        }
    }
}
