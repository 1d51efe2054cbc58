//! HTTP service that multiplies random square matrices and generates random
//! tables on demand.
//!
//! The numeric core lives in [`compute`]; [`http`] is the raw-socket boundary
//! around it.

pub mod compute;
pub mod config;
pub mod errors;
pub mod http;
pub mod logger;
pub mod utils;
pub mod worker_pool;
