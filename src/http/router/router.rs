use std::sync::Arc;
use std::sync::mpsc;

use tracing::info;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    http::{
        handler::{RequestHandlerStrategy, Dispatcher},
        request::HttpRequest,
        response::Response,
        router::{command, compute},
        server::ServerStats,
    },
    worker_pool::ThreadPool,
};

pub struct SimpleHandler<F>(pub F);

impl<F> RequestHandlerStrategy for SimpleHandler<F>
where
    F: Fn(&HttpRequest) -> Result<Response, ServerError> + Send + Sync + 'static,
{
    fn handle(&self, req: &HttpRequest) -> Result<Response, ServerError> {
        (self.0)(req)
    }
}

/// Runs the wrapped handler on a worker pool and blocks the connection thread
/// until it answers.
pub struct PooledHandler {
    pool: ThreadPool,
    handler: Arc<dyn RequestHandlerStrategy>,
}

impl PooledHandler {
    pub fn new(
        pool: ThreadPool,
        handler: Arc<dyn RequestHandlerStrategy>,
    ) -> Self {
        Self { pool, handler }
    }

    pub fn pool(&self) -> &ThreadPool {
        &self.pool
    }
}

impl RequestHandlerStrategy for PooledHandler {
    fn handle(&self, req: &HttpRequest) -> Result<Response, ServerError> {
        let (tx, rx) = mpsc::channel();
        let handler = self.handler.clone();
        let request = req.clone();

        self.pool.execute(move || {
            let outcome = handler.handle(&request);
            let _ = tx.send(outcome);
        });

        rx.recv().unwrap_or_else(|_| {
            Err(ServerError::Internal(
                "Worker pool dropped the response channel".into(),
            ))
        })
    }
}

pub fn build_routes(cfg: &ServerConfig, stats: Arc<ServerStats>) -> Dispatcher {
    let compute_pool = ThreadPool::new("compute", cfg.compute_workers);
    let generate_pool = ThreadPool::new("generate", cfg.generate_workers);

    let matrix: Arc<dyn RequestHandlerStrategy> = Arc::new(PooledHandler::new(
        compute_pool.clone(),
        Arc::new(compute::MatrixHandler { max_dimension: cfg.max_dimension }),
    ));
    let table: Arc<dyn RequestHandlerStrategy> = Arc::new(PooledHandler::new(
        generate_pool.clone(),
        Arc::new(compute::TableHandler { max_rows: cfg.max_table_rows }),
    ));

    let mut builder = Dispatcher::builder();
    builder = compute::register(builder, matrix, table);
    builder = command::register(builder, stats, vec![compute_pool, generate_pool]);

    let dispatcher = builder.build();
    info!(routes = ?dispatcher.paths(), "router loaded");
    dispatcher
}

pub trait QueryParam {
    fn query_param(&self, key: &str) -> Option<&str>;
}

impl QueryParam for HttpRequest {
    /// First value for `key`, already percent-decoded.
    fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::OK;
    use std::io::Cursor;

    fn request(target: &str) -> HttpRequest {
        let raw = format!("GET {target} HTTP/1.0\r\n\r\n");
        HttpRequest::parse(&mut Cursor::new(raw.into_bytes())).unwrap()
    }

    #[test]
    fn query_param_returns_first_match() {
        let req = request("/x?a=1&b=2&a=3");
        assert_eq!(req.query_param("a"), Some("1"));
        assert_eq!(req.query_param("b"), Some("2"));
        assert_eq!(req.query_param("c"), None);
    }

    #[test]
    fn pooled_handler_runs_on_the_pool() {
        let inner = Arc::new(SimpleHandler(|req: &HttpRequest| -> Result<Response, ServerError> {
            let name = std::thread::current().name().unwrap_or("").to_string();
            Ok(Response::new(OK).with_body(format!("{} {}", req.path, name)))
        }));
        let pooled = PooledHandler::new(ThreadPool::new("unit", 1), inner);

        let resp = pooled.handle(&request("/hello")).unwrap();
        assert_eq!(String::from_utf8(resp.body).unwrap(), "/hello unit-worker-0");
        assert_eq!(pooled.pool().name(), "unit");
    }

    #[test]
    fn pooled_handler_reports_panics_as_internal() {
        let inner = Arc::new(SimpleHandler(|_req: &HttpRequest| -> Result<Response, ServerError> {
            panic!("handler bug")
        }));
        let pooled = PooledHandler::new(ThreadPool::new("unit-panic", 1), inner);
        assert!(matches!(pooled.handle(&request("/")), Err(ServerError::Internal(_))));
    }

    #[test]
    fn build_routes_registers_all_paths() {
        let cfg = ServerConfig { compute_workers: 1, generate_workers: 1, ..ServerConfig::default() };
        let dispatcher = build_routes(&cfg, Arc::new(ServerStats::new()));
        assert_eq!(
            dispatcher.paths(),
            vec![
                "/",
                "/compute",
                "/generate",
                "/help",
                "/matrix-multiplication/compute",
                "/status",
                "/table-generator/generate",
            ]
        );
    }
}
