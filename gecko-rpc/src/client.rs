//! 客户端工厂
//!
//! 一个工厂对应一种服务客户端：保存客户端的构造函数，以及按方法名索引的调用表。
//! 调用表在启动时构造一次，调用时按名字查表，而不是在运行时反射查找方法。
//! 表中的每一项都把请求和响应擦除成 `Box<dyn Any + Send>`，
//! 这样同一个工厂里可以放请求/响应类型各不相同的方法。

use std::{
    any::{type_name, Any},
    collections::HashMap,
    fmt,
    future::Future,
};

use futures::future::{self, BoxFuture, FutureExt};
use tonic::{transport::Channel, Request, Response, Status};

use crate::{context::CallContext, error::Error};

pub(crate) type Payload = Box<dyn Any + Send>;

type Constructor<C> = Box<dyn Fn(Channel) -> C + Send + Sync>;
type Method<C> =
    Box<dyn Fn(C, CallContext, Payload) -> BoxFuture<'static, Result<Payload, Error>> + Send + Sync>;

pub struct ClientFactory<C> {
    name: String,
    constructor: Constructor<C>,
    methods: HashMap<String, Method<C>>,
}

impl<C: Send + 'static> ClientFactory<C> {
    /// `constructor` 通常就是生成代码里的 `XxxClient::new`
    pub fn new<F>(name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(Channel) -> C + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            constructor: Box::new(constructor),
            methods: HashMap::new(),
        }
    }

    /// 注册一个方法，同名方法后注册的覆盖先注册的
    ///
    /// ```ignore
    /// let factory = ClientFactory::new("echo", EchoClient::<Channel>::new)
    ///     .method("UnaryEcho", |mut client: EchoClient<Channel>, req| async move {
    ///         client.unary_echo(req).await
    ///     });
    /// ```
    pub fn method<Req, Resp, F, Fut>(mut self, name: &str, f: F) -> Self
    where
        Req: Send + 'static,
        Resp: Send + 'static,
        F: Fn(C, Request<Req>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<Resp>, Status>> + Send + 'static,
    {
        let method_name = name.to_string();
        let method = move |client: C,
                           ctx: CallContext,
                           req: Payload|
              -> BoxFuture<'static, Result<Payload, Error>> {
            match req.downcast::<Req>() {
                Ok(req) => f(client, ctx.into_request(*req))
                    .map(|result| {
                        result
                            .map(|resp| Box::new(resp.into_inner()) as Payload)
                            .map_err(Error::Remote)
                    })
                    .boxed(),
                Err(_) => future::ready(Err(Error::dispatch(
                    &method_name,
                    format!("request type mismatch, expected {}", type_name::<Req>()),
                )))
                .boxed(),
            }
        };
        self.methods.insert(name.to_string(), Box::new(method));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// 已注册的方法名，按字典序
    pub fn methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        methods.sort_unstable();
        methods
    }

    pub(crate) fn build(&self, channel: Channel) -> C {
        (self.constructor)(channel)
    }

    pub(crate) fn invoke(
        &self,
        client: C,
        method: &str,
        ctx: CallContext,
        req: Payload,
    ) -> BoxFuture<'static, Result<Payload, Error>> {
        match self.methods.get(method) {
            Some(f) => f(client, ctx, req),
            None => future::ready(Err(Error::dispatch(
                method,
                format!("method not found on client '{}'", self.name),
            )))
            .boxed(),
        }
    }
}

impl<C> fmt::Debug for ClientFactory<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&String> = self.methods.keys().collect();
        methods.sort();
        f.debug_struct("ClientFactory")
            .field("name", &self.name)
            .field("methods", &methods)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter;

    fn factory() -> ClientFactory<Counter> {
        ClientFactory::new("counter", |_channel| Counter)
            .method("Incr", |_client: Counter, req: Request<u64>| async move {
                Ok::<_, Status>(Response::new(req.into_inner() + 1))
            })
            .method("Name", |_client: Counter, _req: Request<()>| async move {
                Ok::<_, Status>(Response::new("counter".to_string()))
            })
    }

    #[test]
    fn methods_are_listed_sorted() {
        let factory = factory();
        assert_eq!(factory.name(), "counter");
        assert_eq!(factory.methods(), vec!["Incr", "Name"]);
        assert!(factory.has_method("Incr"));
        assert!(!factory.has_method("incr"));
        assert!(format!("{factory:?}").contains("Incr"));
    }

    #[tokio::test]
    async fn invoke_runs_adapter() {
        let factory = factory();
        let resp = factory
            .invoke(Counter, "Incr", CallContext::new(), Box::new(41u64))
            .await
            .unwrap();
        assert_eq!(*resp.downcast::<u64>().unwrap(), 42);
    }

    #[tokio::test]
    async fn invoke_unknown_method_is_dispatch_error() {
        let err = factory()
            .invoke(Counter, "Decr", CallContext::new(), Box::new(1u64))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Dispatch { ref method, .. } if method == "Decr"));
        assert!(err.to_string().contains("method not found"));
    }

    #[tokio::test]
    async fn invoke_with_wrong_request_type_is_dispatch_error() {
        let err = factory()
            .invoke(Counter, "Incr", CallContext::new(), Box::new("one"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Dispatch { .. }));
        assert!(err.to_string().contains("request type mismatch"));
    }
}
