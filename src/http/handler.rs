use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::ServerError;
use super::request::{HttpMethod, HttpRequest};
use super::response::Response;

pub trait RequestHandlerStrategy: Send + Sync + 'static {
    fn handle(&self, req: &HttpRequest) -> Result<Response, ServerError>;
}

type RouteMap = HashMap<String, Arc<dyn RequestHandlerStrategy>>;

/// Routes a request to its handler by method and exact path.
pub struct Dispatcher {
    get: RouteMap,
    head: RouteMap,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder { DispatcherBuilder::default() }

    pub fn dispatch(&self, req: &HttpRequest) -> Result<Response, ServerError> {
        let routes = match req.method {
            HttpMethod::GET => &self.get,
            HttpMethod::HEAD => &self.head,
            HttpMethod::Unsupported(ref m) => {
                return Err(ServerError::BadRequest(format!("Unsupported method: {}", m)))
            }
        };

        match routes.get(&req.path) {
            Some(handler) => handler.handle(req),
            None => Err(ServerError::NotFound),
        }
    }

    /// Registered GET paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.get.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}

#[derive(Default)]
pub struct DispatcherBuilder {
    get_map: RouteMap,
    head_map: RouteMap,
}

impl DispatcherBuilder {
    pub fn get(mut self, path: &str, handler: Arc<dyn RequestHandlerStrategy>) -> Self { self.get_map.insert(path.to_string(), handler); self }
    pub fn head(mut self, path: &str, handler: Arc<dyn RequestHandlerStrategy>) -> Self { self.head_map.insert(path.to_string(), handler); self }

    /// Registers the same handler for GET and HEAD.
    pub fn get_and_head(self, path: &str, handler: Arc<dyn RequestHandlerStrategy>) -> Self {
        self.get(path, handler.clone()).head(path, handler)
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher { get: self.get_map, head: self.head_map }
    }
}
