use std::sync::Arc;

use serde_json::json;

use crate::http::{
    handler::{RequestHandlerStrategy, DispatcherBuilder},
    request::HttpRequest,
    response::{Response, OK, CONTENT_TYPE_TEXT},
    router::router::SimpleHandler,
    server::ServerStats,
};
use crate::errors::ServerError;
use crate::utils::text;
use crate::worker_pool::ThreadPool;

// /
fn index_handler(_req: &HttpRequest) -> Result<Response, ServerError> {
    Ok(Response::html(
        OK,
        "<html><body><h1>matrix-server</h1>\
         <p><a href=\"/compute?dimension=4\">/compute?dimension=N</a></p>\
         <p><a href=\"/generate?rows=5\">/generate?rows=N</a></p>\
         <p><a href=\"/help\">/help</a></p></body></html>",
    ))
}

// /help
fn help_handler(_req: &HttpRequest) -> Result<Response, ServerError> {
    Ok(Response::new(OK)
        .set_header("Content-Type", CONTENT_TYPE_TEXT)
        .with_body(text::help()))
}

// /status
pub struct ServerStatusHandler {
    pub stats: Arc<ServerStats>,
    pub pools: Vec<ThreadPool>,
}

impl RequestHandlerStrategy for ServerStatusHandler {
    fn handle(&self, _req: &HttpRequest) -> Result<Response, ServerError> {
        let pools: Vec<_> = self.pools.iter().map(ThreadPool::snapshot).collect();

        let body = json!({
            "server": {
                "pid": std::process::id(),
                "uptime_secs": self.stats.uptime().as_secs(),
                "attended_connections": self.stats.total_connections(),
                "active_connections": self.stats.active_connections(),
            },
            "pools": pools,
        });

        Ok(Response::json(OK, &body))
    }
}

pub fn register(
    builder: DispatcherBuilder,
    stats: Arc<ServerStats>,
    pools: Vec<ThreadPool>,
) -> DispatcherBuilder {
    builder
        .get_and_head("/", Arc::new(SimpleHandler(index_handler)))
        .get("/help", Arc::new(SimpleHandler(help_handler)))
        .get("/status", Arc::new(ServerStatusHandler { stats, pools }))
}
