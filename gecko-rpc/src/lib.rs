//! 一个 grpc 客户端连接库
//!
//! 每个服务名维护一条长连接，并提供统一的调用入口：
//! 给出服务名、客户端工厂、方法名和请求，找到连接，构造客户端，调用方法，
//! 返回响应或统一的错误。

pub use client::ClientFactory;
pub use config::{ClientConfig, Config, DialConfig, ResolverConfig};
pub use conn::Conn;
pub use context::CallContext;
pub use dispatcher::{Dispatcher, SetupHandle, SetupReport};
pub use error::{Error, ErrorKind};
pub use registry::ConnRegistry;
pub use resolver::{DirectResolver, Resolver, StaticResolver};

mod client;
pub mod config;
mod conn;
mod context;
mod dispatcher;
pub mod error;
pub mod registry;
pub mod resolver;
