//! Request dispatch.
//!
//! Callers send a request value; the [`Dispatcher`] routes it to the one
//! handler registered for that request type and returns the handler's
//! response untouched.

use std::{
    any::{type_name, Any, TypeId},
    collections::HashMap,
    fmt,
    sync::Arc,
};

use async_trait::async_trait;

/// A message with exactly one handler.
pub trait Request: Send + 'static {
    type Response: Send + 'static;
}

#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    type Request: Request;

    async fn handle(&self, request: Self::Request) -> <Self::Request as Request>::Response;
}

struct Route {
    request: &'static str,
    /// `Arc<dyn RequestHandler<Request = R>>` for the keyed `R`.
    handler: Box<dyn Any + Send + Sync>,
}

#[derive(Default)]
pub struct DispatcherBuilder {
    routes: HashMap<TypeId, Route>,
    declared: Vec<(TypeId, &'static str)>,
}

impl DispatcherBuilder {
    /// # Panics
    ///
    /// If a handler for the same request type is already registered.
    #[track_caller]
    pub fn register<H: RequestHandler>(mut self, handler: H) -> Self {
        let request = type_name::<H::Request>();
        let key = TypeId::of::<H::Request>();
        if self.routes.contains_key(&key) {
            panic!("a handler for {request} is already registered");
        }

        let handler: Arc<dyn RequestHandler<Request = H::Request>> = Arc::new(handler);
        tracing::debug!(request, handler = type_name::<H>(), "registered request handler");
        self.routes.insert(
            key,
            Route {
                request,
                handler: Box::new(handler),
            },
        );
        self
    }

    /// Require a handler for `R` to be registered before [`build`](Self::build).
    pub fn declare<R: Request>(mut self) -> Self {
        self.declared.push((TypeId::of::<R>(), type_name::<R>()));
        self
    }

    /// # Panics
    ///
    /// If any declared request type has no handler.
    #[track_caller]
    pub fn build(self) -> Dispatcher {
        let missing: Vec<&str> = self
            .declared
            .iter()
            .filter(|(key, _)| !self.routes.contains_key(key))
            .map(|(_, name)| *name)
            .collect();
        if !missing.is_empty() {
            panic!("no handler registered for: {}", missing.join(", "));
        }

        Dispatcher {
            routes: Arc::new(self.routes),
        }
    }
}

/// Immutable routing table from request type to handler. Cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
    routes: Arc<HashMap<TypeId, Route>>,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    pub fn handles<R: Request>(&self) -> bool {
        self.routes.contains_key(&TypeId::of::<R>())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Invoke the handler registered for `R` once.
    ///
    /// # Panics
    ///
    /// If no handler is registered for `R`; that is a wiring bug, not a
    /// business failure.
    pub async fn send<R: Request>(&self, request: R) -> R::Response {
        let handler = self.handler::<R>();
        tracing::debug!(request = type_name::<R>(), "dispatching request");
        handler.handle(request).await
    }

    #[track_caller]
    fn handler<R: Request>(&self) -> Arc<dyn RequestHandler<Request = R>> {
        let found = self
            .routes
            .get(&TypeId::of::<R>())
            .and_then(|route| route.handler.downcast_ref::<Arc<dyn RequestHandler<Request = R>>>());
        match found {
            Some(handler) => Arc::clone(handler),
            None => panic!("no handler registered for {}", type_name::<R>()),
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut requests: Vec<_> = self.routes.values().map(|r| r.request).collect();
        requests.sort_unstable();
        f.debug_struct("Dispatcher")
            .field("requests", &requests)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Ping(u32);

    impl Request for Ping {
        type Response = Result<u32, String>;
    }

    struct Unrouted;

    impl Request for Unrouted {
        type Response = ();
    }

    #[derive(Clone, Default)]
    struct Echo {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RequestHandler for Echo {
        type Request = Ping;

        async fn handle(&self, request: Ping) -> Result<u32, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if request.0 == 0 {
                Err("zero".to_string())
            } else {
                Ok(request.0 * 2)
            }
        }
    }

    #[tokio::test]
    async fn registered_handler_runs_once_per_send() {
        let echo = Echo::default();
        let dispatcher = Dispatcher::builder()
            .register(echo.clone())
            .declare::<Ping>()
            .build();

        assert_eq!(dispatcher.send(Ping(21)).await, Ok(42));
        assert_eq!(echo.calls.load(Ordering::SeqCst), 1);

        assert_eq!(dispatcher.send(Ping(0)).await, Err("zero".to_string()));
        assert_eq!(echo.calls.load(Ordering::SeqCst), 2);
        assert!(dispatcher.handles::<Ping>());
        assert!(!dispatcher.handles::<Unrouted>());
    }

    #[tokio::test]
    #[should_panic(expected = "no handler registered for")]
    async fn unregistered_request_panics() {
        let dispatcher = Dispatcher::builder().register(Echo::default()).build();
        dispatcher.send(Unrouted).await;
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_handler_panics() {
        let _ = Dispatcher::builder()
            .register(Echo::default())
            .register(Echo::default());
    }

    #[test]
    #[should_panic(expected = "Unrouted")]
    fn declared_request_without_handler_fails_build() {
        let _ = Dispatcher::builder()
            .register(Echo::default())
            .declare::<Ping>()
            .declare::<Unrouted>()
            .build();
    }

    #[test]
    fn debug_lists_request_types() {
        let dispatcher = Dispatcher::builder().register(Echo::default()).build();
        assert_eq!(dispatcher.len(), 1);
        assert!(format!("{dispatcher:?}").contains("Ping"));
    }
}
