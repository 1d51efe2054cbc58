use std::{
    collections::VecDeque,
    io::{self, Read, Write, ErrorKind},
    net::TcpStream,
    os::fd::{FromRawFd, RawFd},
    sync::{
        Arc,
        Mutex,
        PoisonError,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use libc::{
    self, c_int, sockaddr, sockaddr_in, socklen_t,
    AF_INET, SOCK_STREAM, SOL_SOCKET, SO_REUSEADDR,
};
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    http::{
        handler::Dispatcher,
        request::{HttpRequest, HttpMethod},
        response::{
            Status, Response,
            BAD_REQUEST, NOT_FOUND,
            TOO_MANY_REQUESTS, INTERNAL_SERVER_ERROR, SERVICE_UNAVAILABLE,
        },
    },
};

/// Process-wide connection counters, shared with the status endpoint.
#[derive(Debug)]
pub struct ServerStats {
    started_at: Instant,
    total_connections: AtomicU64,
    active_connections: AtomicUsize,
}

impl Default for ServerStats {
    fn default() -> Self { Self::new() }
}

impl ServerStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total_connections: AtomicU64::new(0),
            active_connections: AtomicUsize::new(0),
        }
    }

    pub fn uptime(&self) -> Duration { self.started_at.elapsed() }
    pub fn total_connections(&self) -> u64 { self.total_connections.load(Ordering::SeqCst) }
    pub fn active_connections(&self) -> usize { self.active_connections.load(Ordering::SeqCst) }

    fn connection_opened(&self) {
        self.total_connections.fetch_add(1, Ordering::SeqCst);
        self.active_connections.fetch_add(1, Ordering::SeqCst);
    }

    fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct HttpServer {
    pub cfg: ServerConfig,
    pub dispatcher: Arc<Dispatcher>,
    stats: Arc<ServerStats>,
    window: Mutex<VecDeque<Instant>>,
}

impl HttpServer {
    pub fn with_dispatcher(cfg: ServerConfig, dispatcher: Dispatcher, stats: Arc<ServerStats>) -> Self {
        Self {
            cfg,
            dispatcher: Arc::new(dispatcher),
            stats,
            window: Mutex::new(VecDeque::new()),
        }
    }

    pub fn run(&self) -> io::Result<()> {
        let (ip, port) = parse_ipv4_addr(&self.cfg.bind_addr)?;
        let listen_fd = create_listen_socket(ip, port)?;
        info!(bind_addr = %self.cfg.bind_addr, "listening");

        loop {
            let client_fd = match Self::accept_client(listen_fd) {
                Ok(fd) => fd,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            };

            if self.stats.active_connections() >= self.cfg.max_connections {
                warn!(limit = self.cfg.max_connections, "rejecting connection: too many connections");
                Self::reject_client(client_fd, SERVICE_UNAVAILABLE, "Service Unavailable: too many connections");
                continue;
            }

            if self.is_rate_limited() {
                warn!(limit = self.cfg.rate_limit_per_sec, "rejecting connection: rate limited");
                Self::reject_client(client_fd, TOO_MANY_REQUESTS, "Too Many Requests");
                continue;
            }

            self.stats.connection_opened();
            let dispatcher = Arc::clone(&self.dispatcher);
            let stats = Arc::clone(&self.stats);
            let read_timeout = self.cfg.read_timeout;

            let spawned = thread::Builder::new()
                .name("conn".into())
                .spawn(move || {
                    if let Err(e) = Self::serve_client(client_fd, read_timeout, &dispatcher) {
                        warn!(error = %e, "error handling connection");
                    }
                    stats.connection_closed();
                });

            if let Err(e) = spawned {
                error!(error = %e, "failed to spawn connection thread");
                self.stats.connection_closed();
                Self::reject_client(client_fd, SERVICE_UNAVAILABLE, "Service Unavailable");
            }
        }
    }

    fn accept_client(listen_fd: RawFd) -> io::Result<RawFd> {
        let mut addr: sockaddr_in = unsafe { std::mem::zeroed() };
        let mut addr_len = std::mem::size_of::<sockaddr_in>() as socklen_t;

        let fd = unsafe {
            libc::accept(
                listen_fd,
                (&mut addr as *mut sockaddr_in).cast::<sockaddr>(),
                &mut addr_len,
            )
        };

        if fd < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(fd)
        }
    }

    fn serve_client(fd: RawFd, read_timeout: Duration, dispatcher: &Dispatcher) -> Result<(), ServerError> {
        // SAFETY: fd was just returned by accept() and is owned solely by this stream
        let mut stream = unsafe { TcpStream::from_raw_fd(fd) };
        stream.set_read_timeout(Some(read_timeout))?;
        handle_connection(&mut stream, dispatcher)
    }

    fn reject_client(fd: RawFd, status: Status, message: &str) {
        // SAFETY: fd was just returned by accept(); dropping the stream closes it
        let mut stream = unsafe { TcpStream::from_raw_fd(fd) };
        let response = Response::new(status).with_body(message);
        let _ = stream.write_all(&response.to_bytes(false));
        let _ = stream.flush();
    }

    fn is_rate_limited(&self) -> bool {
        let now = Instant::now();
        let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);

        while let Some(&front) = window.front() {
            if now.duration_since(front) > Duration::from_secs(1) {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() >= self.cfg.rate_limit_per_sec {
            true
        } else {
            window.push_back(now);
            false
        }
    }
}

pub fn status_for(err: &ServerError) -> Status {
    match err {
        ServerError::BadRequest(_) => BAD_REQUEST,
        ServerError::NotFound => NOT_FOUND,
        ServerError::TooManyRequests => TOO_MANY_REQUESTS,
        ServerError::ServiceUnavailable => SERVICE_UNAVAILABLE,
        ServerError::Internal(_) | ServerError::Io(_) => INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &ServerError) -> Response {
    Response::json(status_for(err), &serde_json::json!({ "error": err.to_string() }))
}

/// Reads one request, dispatches it and writes the response. The connection is
/// closed by the caller afterwards.
pub fn handle_connection<RW: Read + Write>(
    rw: &mut RW,
    dispatcher: &Dispatcher,
) -> Result<(), ServerError> {
    let request_id = Uuid::new_v4();
    let started = Instant::now();

    let (resp, is_head) = match HttpRequest::parse(rw) {
        Ok(req) => {
            let span = info_span!(
                "request",
                %request_id,
                method = req.method.as_str(),
                path = %req.path
            );
            let _enter = span.enter();

            let is_head = matches!(req.method, HttpMethod::HEAD);
            let resp = dispatcher.dispatch(&req).unwrap_or_else(|err| {
                match &err {
                    ServerError::Internal(_) | ServerError::Io(_) => error!(error = %err, "request failed"),
                    _ => warn!(error = %err, "request rejected"),
                }
                error_response(&err)
            });

            info!(
                status = resp.status.code,
                elapsed_us = started.elapsed().as_micros() as u64,
                "request completed"
            );
            (resp, is_head)
        }

        Err(ServerError::Io(e)) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
            warn!(%request_id, "client sent no request before the read timeout");
            return Err(ServerError::Io(e));
        }

        Err(e) => {
            warn!(%request_id, error = %e, "unparseable request");
            (error_response(&e), false)
        }
    };

    rw.write_all(&resp.to_bytes(is_head))?;
    rw.flush()?;
    Ok(())
}

pub fn create_listen_socket(ip_host: u32, port_host: u16) -> io::Result<RawFd> {
    let fd = unsafe { libc::socket(AF_INET, SOCK_STREAM, 0) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }

    // Allow immediate reuse of port
    let opt: c_int = 1;
    unsafe {
        libc::setsockopt(
            fd,
            SOL_SOCKET,
            SO_REUSEADDR,
            (&opt as *const c_int).cast(),
            std::mem::size_of_val(&opt) as socklen_t,
        );
    }

    let mut addr: sockaddr_in = unsafe { std::mem::zeroed() };
    addr.sin_family = AF_INET as libc::sa_family_t;
    addr.sin_port = port_host.to_be();
    addr.sin_addr.s_addr = ip_host; // already in network byte order

    let rc = unsafe {
        libc::bind(
            fd,
            (&addr as *const sockaddr_in).cast::<sockaddr>(),
            std::mem::size_of::<sockaddr_in>() as socklen_t,
        )
    };
    if rc < 0 {
        let e = io::Error::last_os_error();
        unsafe { libc::close(fd) };
        return Err(e);
    }

    let rc = unsafe { libc::listen(fd, 128) };
    if rc < 0 {
        let e = io::Error::last_os_error();
        unsafe { libc::close(fd) };
        return Err(e);
    }

    Ok(fd)
}

fn create_parse_error(msg: &str) -> io::Error {
    io::Error::new(ErrorKind::InvalidInput, msg)
}

/// Parses `HOST:PORT` into a network-order IPv4 address and a host-order port.
fn parse_ipv4_addr(addr: &str) -> io::Result<(u32, u16)> {
    let (host_str, port_str) = addr.trim().rsplit_once(':')
        .ok_or_else(|| create_parse_error("Address format must be 'HOST:PORT'"))?;

    let host_str = host_str.trim();
    let port_str = port_str.trim();

    let port: u16 = port_str.parse()
        .map_err(|_| create_parse_error(&format!("Invalid port value: '{}'", port_str)))?;

    let final_host_str = match host_str {
        "*" | "0.0.0.0" => return Ok((0u32, port)),
        host if host.eq_ignore_ascii_case("localhost") => "127.0.0.1",
        host => host,
    };

    let parts: Vec<&str> = final_host_str.split('.').collect();
    if parts.len() != 4 {
        return Err(create_parse_error(&format!("Invalid IPv4 format: '{}' must have 4 octets", final_host_str)));
    }

    let mut octets: [u8; 4] = [0; 4];
    for (octet, part) in octets.iter_mut().zip(parts) {
        *octet = part.parse::<u8>()
            .map_err(|_| create_parse_error(&format!("Invalid octet value: '{}'", part)))?;
    }

    Ok((u32::from_ne_bytes(octets), port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::handler::RequestHandlerStrategy;
    use crate::http::response::OK;

    /// In-memory duplex stream: reads from `input`, collects writes in `output`.
    struct MockStream {
        input: io::Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl MockStream {
        fn new(raw: &str) -> Self {
            Self { input: io::Cursor::new(raw.as_bytes().to_vec()), output: Vec::new() }
        }
        fn written(&self) -> String {
            String::from_utf8_lossy(&self.output).into_owned()
        }
    }

    impl Read for MockStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> { self.input.read(buf) }
    }

    impl Write for MockStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> { self.output.write(buf) }
        fn flush(&mut self) -> io::Result<()> { Ok(()) }
    }

    struct Hello;
    impl RequestHandlerStrategy for Hello {
        fn handle(&self, _req: &HttpRequest) -> Result<Response, ServerError> {
            Ok(Response::new(OK).with_body("hello"))
        }
    }

    struct Broken;
    impl RequestHandlerStrategy for Broken {
        fn handle(&self, _req: &HttpRequest) -> Result<Response, ServerError> {
            Err(ServerError::Internal("boom".into()))
        }
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::builder()
            .get_and_head("/hello", Arc::new(Hello))
            .get("/broken", Arc::new(Broken))
            .build()
    }

    fn roundtrip(raw: &str) -> String {
        let mut stream = MockStream::new(raw);
        handle_connection(&mut stream, &dispatcher()).unwrap();
        stream.written()
    }

    #[test]
    fn serves_get() {
        let out = roundtrip("GET /hello HTTP/1.1\r\nHost: localhost\r\n\r\n");
        assert!(out.starts_with("HTTP/1.0 200 OK\r\n"));
        assert!(out.ends_with("hello"));
    }

    #[test]
    fn head_has_no_body() {
        let out = roundtrip("HEAD /hello HTTP/1.0\r\n\r\n");
        assert!(out.starts_with("HTTP/1.0 200 OK\r\n"));
        assert!(out.contains("Content-Length: 5\r\n"));
        assert!(out.ends_with("\r\n\r\n"));
    }

    #[test]
    fn errors_become_json() {
        let out = roundtrip("GET /missing HTTP/1.0\r\n\r\n");
        assert!(out.starts_with("HTTP/1.0 404 Not Found\r\n"));
        assert!(out.ends_with(r#"{"error":"NotFound"}"#));

        let out = roundtrip("GET /broken HTTP/1.0\r\n\r\n");
        assert!(out.starts_with("HTTP/1.0 500 Internal Server Error\r\n"));
        assert!(out.contains("Internal: boom"));
    }

    #[test]
    fn garbage_is_bad_request() {
        let out = roundtrip("nonsense\r\n\r\n");
        assert!(out.starts_with("HTTP/1.0 400 Bad Request\r\n"));
    }

    #[test]
    fn oversize_request_is_bad_request() {
        let raw = format!("GET /{} HTTP/1.0\r\n\r\n", "a".repeat(20_000));
        let out = roundtrip(&raw);
        assert!(out.starts_with("HTTP/1.0 400 Bad Request\r\n"));
    }

    #[test]
    fn idle_client_is_dropped_after_read_timeout() {
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (mut conn, _) = listener.accept().unwrap();
        conn.set_read_timeout(Some(Duration::from_millis(50))).unwrap();

        let started = Instant::now();
        let result = handle_connection(&mut conn, &dispatcher());
        assert!(matches!(result, Err(ServerError::Io(_))));
        assert!(started.elapsed() < Duration::from_secs(5));

        drop(conn);
        let mut leftover = Vec::new();
        client.read_to_end(&mut leftover).unwrap();
        assert!(leftover.is_empty());
    }

    #[test]
    fn parses_bind_addresses() {
        assert_eq!(parse_ipv4_addr("127.0.0.1:8080").unwrap(), (u32::from_ne_bytes([127, 0, 0, 1]), 8080));
        assert_eq!(parse_ipv4_addr("localhost:9").unwrap(), (u32::from_ne_bytes([127, 0, 0, 1]), 9));
        assert_eq!(parse_ipv4_addr("0.0.0.0:80").unwrap(), (0, 80));
        assert!(parse_ipv4_addr("1.2.3:80").is_err());
        assert!(parse_ipv4_addr("1.2.3.4.5:80").is_err());
        assert!(parse_ipv4_addr("1.2.3.999:80").is_err());
        assert!(parse_ipv4_addr("1.2.3.4").is_err());
        assert!(parse_ipv4_addr("1.2.3.4:http").is_err());
    }

    #[test]
    fn stats_track_connections() {
        let stats = ServerStats::new();
        stats.connection_opened();
        stats.connection_opened();
        stats.connection_closed();
        assert_eq!(stats.total_connections(), 2);
        assert_eq!(stats.active_connections(), 1);
    }

    #[test]
    fn rate_limiter_caps_per_second() {
        let cfg = ServerConfig { rate_limit_per_sec: 2, ..ServerConfig::default() };
        let server = HttpServer::with_dispatcher(cfg, dispatcher(), Arc::new(ServerStats::new()));
        assert!(!server.is_rate_limited());
        assert!(!server.is_rate_limited());
        assert!(server.is_rate_limited());
    }
}
