use std::process;
use std::sync::Arc;

use dotenv::dotenv;
use tracing::{error, info};

use matrix_server::{
    config::ServerConfig,
    http::{
        router::router::build_routes,
        server::{HttpServer, ServerStats},
    },
    logger,
};

fn main() {
    dotenv().ok();

    let cfg = ServerConfig::from_env();
    logger::init(cfg.log_format);
    info!(?cfg, "starting matrix-server");

    let stats = Arc::new(ServerStats::new());
    let dispatcher = build_routes(&cfg, Arc::clone(&stats));
    let server = HttpServer::with_dispatcher(cfg, dispatcher, stats);

    if let Err(e) = server.run() {
        error!(error = %e, "server encountered a fatal error");
        process::exit(1);
    }
}
