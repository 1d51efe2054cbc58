use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::compute::{self, Summary};
use crate::errors::ServerError;
use crate::http::{
    handler::{DispatcherBuilder, RequestHandlerStrategy},
    render::{self, Format},
    request::HttpRequest,
    response::Response,
    router::router::QueryParam,
};
use crate::utils::hash;

/// Fresh generator per request; a `seed` makes the response reproducible.
fn request_rng(req: &HttpRequest) -> Result<StdRng, ServerError> {
    match req.query_param("seed") {
        None => Ok(StdRng::from_entropy()),
        Some(raw) => raw
            .parse::<u64>()
            .map(StdRng::seed_from_u64)
            .map_err(|_| ServerError::BadRequest(format!("Invalid seed: {}", raw))),
    }
}

fn parse_flag(name: &str, raw: Option<&str>) -> Result<bool, ServerError> {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        None | Some("false") | Some("0") | Some("no") => Ok(false),
        Some("") | Some("true") | Some("1") | Some("yes") => Ok(true),
        Some(other) => Err(ServerError::BadRequest(format!(
            "Invalid value for '{}': {}", name, other
        ))),
    }
}

/// Bad requests are answered in the caller's format; anything else goes to
/// the server's generic error path.
fn respond(format: Format, outcome: Result<Response, ServerError>) -> Result<Response, ServerError> {
    match outcome {
        Err(err @ ServerError::BadRequest(_)) => Ok(render::error(format, &err)),
        other => other,
    }
}

/// /compute?dimension=N[&seed=S][&format=html|json][&checksum=true]
pub struct MatrixHandler {
    pub max_dimension: usize,
}

impl MatrixHandler {
    fn compute(&self, req: &HttpRequest, format: Format) -> Result<Response, ServerError> {
        let raw = req.query_param("dimension").unwrap_or("");
        let dimension = compute::validate(raw).map_err(|e| {
            warn!(raw, "invalid dimension");
            e
        })?;

        if dimension.get() > self.max_dimension {
            return Err(ServerError::BadRequest(format!(
                "Dimension {} exceeds limit of {}", dimension, self.max_dimension
            )));
        }

        let with_checksum = parse_flag("checksum", req.query_param("checksum"))?;
        let mut rng = request_rng(req)?;

        let started = Instant::now();
        let product = compute::compute_product(dimension, &mut rng)?;
        let summary = Summary::of(&product);
        let checksum = with_checksum.then(|| hash::matrix_checksum(&product));
        let elapsed_ms = started.elapsed().as_millis() as u64;

        info!(dimension = dimension.get(), elapsed_ms, "matrix multiplication completed");
        Ok(render::matrix_result(format, &summary, elapsed_ms, checksum.as_deref()))
    }
}

impl RequestHandlerStrategy for MatrixHandler {
    fn handle(&self, req: &HttpRequest) -> Result<Response, ServerError> {
        let format = Format::parse(req.query_param("format"))?;
        respond(format, self.compute(req, format))
    }
}

/// /generate[?rows=N][&seed=S][&format=html|json]
pub struct TableHandler {
    pub max_rows: usize,
}

impl TableHandler {
    fn generate(&self, req: &HttpRequest, format: Format) -> Result<Response, ServerError> {
        let rows = compute::parse_rows(req.query_param("rows"))?;
        if rows > self.max_rows {
            return Err(ServerError::BadRequest(format!(
                "Rows {} exceeds limit of {}", rows, self.max_rows
            )));
        }

        let mut rng = request_rng(req)?;
        let table = compute::generate_table(rows, &mut rng);

        info!(rows, "table generated");
        Ok(render::table(format, &table))
    }
}

impl RequestHandlerStrategy for TableHandler {
    fn handle(&self, req: &HttpRequest) -> Result<Response, ServerError> {
        let format = Format::parse(req.query_param("format"))?;
        respond(format, self.generate(req, format))
    }
}

/// Mounts both endpoints at their short paths and under their legacy context paths.
pub fn register(
    builder: DispatcherBuilder,
    matrix: Arc<dyn RequestHandlerStrategy>,
    table: Arc<dyn RequestHandlerStrategy>,
) -> DispatcherBuilder {
    builder
        .get_and_head("/compute", matrix.clone())
        .get_and_head("/matrix-multiplication/compute", matrix)
        .get_and_head("/generate", table.clone())
        .get_and_head("/table-generator/generate", table)
}
