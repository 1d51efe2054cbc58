//! Sequential load generator: fires GET requests at a running matrix-server
//! and reports per-request latency in microseconds.

use std::io::{self, ErrorKind, Read, Write};
use std::net::TcpStream;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use tracing::warn;

use matrix_server::logger::{self, LogFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Endpoint {
    /// /matrix-multiplication/compute?dimension=SIZE
    Compute,
    /// /table-generator/generate?rows=SIZE
    Generate,
}

impl Endpoint {
    fn path(self, size: usize) -> String {
        match self {
            Endpoint::Compute => format!("/matrix-multiplication/compute?dimension={}", size),
            Endpoint::Generate => format!("/table-generator/generate?rows={}", size),
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Measure request latency against matrix-server")]
struct Args {
    /// Server port
    port: u16,

    /// Pause between requests, in nanoseconds
    interval_ns: u64,

    /// Matrix dimension or table row count
    size: usize,

    #[arg(long, value_enum, default_value_t = Endpoint::Compute)]
    endpoint: Endpoint,

    /// Number of requests; defaults to 500 for size <= 512, else 5
    #[arg(long)]
    iterations: Option<usize>,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,
}

fn default_iterations(size: usize) -> usize {
    if size <= 512 { 500 } else { 5 }
}

/// Status code from the first line of a raw HTTP response.
fn status_code(response: &[u8]) -> Option<u16> {
    let line_end = response.iter().position(|&b| b == b'\n')?;
    let line = std::str::from_utf8(&response[..line_end]).ok()?;
    let mut parts = line.split_whitespace();
    let version = parts.next()?;
    if !version.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

fn send_request(host: &str, port: u16, path: &str) -> io::Result<Duration> {
    let start = Instant::now();

    let mut stream = TcpStream::connect((host, port))?;
    let request = format!("GET {} HTTP/1.0\r\nHost: {}:{}\r\n\r\n", path, host, port);
    stream.write_all(request.as_bytes())?;
    stream.flush()?;

    let mut response = Vec::new();
    stream.read_to_end(&mut response)?;
    let elapsed = start.elapsed();

    match status_code(&response) {
        Some(200) => Ok(elapsed),
        Some(code) => Err(io::Error::new(ErrorKind::Other, format!("server answered {}", code))),
        None => Err(io::Error::new(ErrorKind::InvalidData, "malformed HTTP response")),
    }
}

fn average_micros(samples: &[u128]) -> Option<f64> {
    if samples.is_empty() {
        None
    } else {
        Some(samples.iter().sum::<u128>() as f64 / samples.len() as f64)
    }
}

fn main() {
    logger::init(LogFormat::Compact);
    let args = Args::parse();

    let path = args.endpoint.path(args.size);
    let iterations = args.iterations.unwrap_or_else(|| default_iterations(args.size));
    let interval = Duration::from_nanos(args.interval_ns);

    println!("Starting request loop to http://{}:{}{}", args.host, args.port, path);

    let mut samples = Vec::with_capacity(iterations);
    for i in 0..iterations {
        match send_request(&args.host, args.port, &path) {
            Ok(elapsed) => {
                let micros = elapsed.as_micros();
                println!("Iter {}: Execution time: {} microseconds", i + 1, micros);
                samples.push(micros);
            }
            Err(e) => warn!(iteration = i + 1, error = %e, "request failed"),
        }

        thread::sleep(interval);
    }

    match average_micros(&samples) {
        Some(avg) => println!("\nAverage Execution Time: {:.2} microseconds", avg),
        None => println!("\nNo successful requests"),
    }
}
