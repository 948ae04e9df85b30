//! Local static file server.
//!
//! Serves a directory tree over HTTP for the test suite and the `serve`
//! preview command. The server is deliberately small: a nonblocking accept
//! loop on a thread, one short-lived thread per connection, no shared state
//! beyond the immutable served root.
//!
//! ## Security Contract
//!
//! Every request path is percent-decoded, stripped of its query string, and
//! checked lexically: `..` segments that climb above the root answer
//! `403 Forbidden` whether or not the target exists. What survives is joined
//! onto the served root and canonicalized, and the canonical result must
//! equal the root or live beneath it, so symlinks cannot escape either. No
//! number of `../` segments, encoded slashes, or symlink tricks can read
//! outside the root, and the 403/404 split never reveals what exists there.
//!
//! Directory listing is disabled by contract: a directory without an
//! `index.html` answers 404, never a listing.
//!
//! ## Lifecycle
//!
//! ```text
//! stopped --start()--> running --stop()--> stopped
//! ```
//!
//! `start()` while running returns the bound port without rebinding;
//! `stop()` while stopped is a no-op. Shutdown is bounded: if the accept
//! loop does not exit within the configured timeout, `stop()` reports
//! [`ServerError::ShutdownTimeout`] instead of blocking forever.

use percent_encoding::percent_decode_str;
use std::fs;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// How many ports above the requested one are probed before giving up.
const PORT_SEARCH_WINDOW: u16 = 100;

/// Read timeout applied to every accepted connection.
const CONNECTION_READ_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("served root does not exist: {0}")]
    RootMissing(PathBuf),
    #[error("no available port in {start}-{end}")]
    NoAvailablePort { start: u16, end: u16 },
    #[error("failed to bind listener: {0}")]
    Bind(#[source] std::io::Error),
    #[error("server did not shut down within {0:?}")]
    ShutdownTimeout(Duration),
}

enum State {
    Stopped,
    Running {
        port: u16,
        stop_tx: Sender<()>,
        done_rx: Receiver<()>,
    },
}

/// A static file server rooted at a single directory.
///
/// All methods take `&self`; lifecycle state lives behind a mutex so the
/// server can be shared with test code freely.
pub struct StaticServer {
    root: PathBuf,
    shutdown_timeout: Duration,
    state: Mutex<State>,
}

impl StaticServer {
    /// Create a server for `root` with the default 5 s shutdown bound.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_shutdown_timeout(root, Duration::from_secs(5))
    }

    pub fn with_shutdown_timeout(root: impl Into<PathBuf>, shutdown_timeout: Duration) -> Self {
        Self {
            root: root.into(),
            shutdown_timeout,
            state: Mutex::new(State::Stopped),
        }
    }

    /// Start listening, probing ports upward from `requested_port`.
    ///
    /// Returns the actually bound port, which may be higher than requested.
    /// Idempotent while running: returns the current port without rebinding.
    pub fn start(&self, requested_port: u16) -> Result<u16, ServerError> {
        let mut state = self.state.lock().unwrap();
        if let State::Running { port, .. } = &*state {
            return Ok(*port);
        }

        if !self.root.is_dir() {
            return Err(ServerError::RootMissing(self.root.clone()));
        }
        let root = fs::canonicalize(&self.root)
            .map_err(|_| ServerError::RootMissing(self.root.clone()))?;

        let (listener, port) = bind_in_window(requested_port)?;
        listener.set_nonblocking(true).map_err(ServerError::Bind)?;

        let (stop_tx, stop_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();
        thread::spawn(move || {
            accept_loop(listener, stop_rx, root);
            let _ = done_tx.send(());
        });

        *state = State::Running {
            port,
            stop_tx,
            done_rx,
        };
        Ok(port)
    }

    /// Stop the server. No-op when already stopped.
    ///
    /// Bounded by the shutdown timeout; on expiry the accept thread is
    /// abandoned and [`ServerError::ShutdownTimeout`] is returned.
    pub fn stop(&self) -> Result<(), ServerError> {
        let mut state = self.state.lock().unwrap();
        let previous = std::mem::replace(&mut *state, State::Stopped);
        let State::Running {
            stop_tx, done_rx, ..
        } = previous
        else {
            return Ok(());
        };

        // The accept loop may already have exited; a send failure is fine.
        let _ = stop_tx.send(());
        match done_rx.recv_timeout(self.shutdown_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => Ok(()),
            Err(RecvTimeoutError::Timeout) => {
                Err(ServerError::ShutdownTimeout(self.shutdown_timeout))
            }
        }
    }

    /// The currently bound port, if running.
    pub fn port(&self) -> Option<u16> {
        match &*self.state.lock().unwrap() {
            State::Running { port, .. } => Some(*port),
            State::Stopped => None,
        }
    }

    /// Base URL of the running server (`http://127.0.0.1:{port}`).
    pub fn url(&self) -> Option<String> {
        self.port().map(|p| format!("http://127.0.0.1:{p}"))
    }

    /// Readiness probe: `GET /` with a short timeout.
    ///
    /// True iff a status line arrives within `timeout` and the status is
    /// below 500. False when the server is not running.
    pub fn is_healthy(&self, timeout: Duration) -> bool {
        let Some(port) = self.port() else {
            return false;
        };
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let Ok(mut stream) = TcpStream::connect_timeout(&addr, timeout) else {
            return false;
        };
        if stream.set_read_timeout(Some(timeout)).is_err()
            || stream.set_write_timeout(Some(timeout)).is_err()
        {
            return false;
        }
        if stream
            .write_all(b"GET / HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\n\r\n")
            .is_err()
        {
            return false;
        }
        let mut buf = [0u8; 64];
        let Ok(n) = stream.read(&mut buf) else {
            return false;
        };
        parse_status_line(&buf[..n]).is_some_and(|status| status < 500)
    }
}

impl Drop for StaticServer {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Pull the numeric status out of an `HTTP/1.1 NNN ...` status line.
fn parse_status_line(head: &[u8]) -> Option<u16> {
    let text = std::str::from_utf8(head).ok()?;
    text.split_whitespace().nth(1)?.parse().ok()
}

// ============================================================================
// Port selection
// ============================================================================

/// Probe ports `start..start + 100` and return the first free one.
///
/// The probe listener is dropped, so the port can be taken by someone else
/// before the caller binds it; `start()` binds directly for that reason.
pub fn find_available_port(start: u16) -> Result<u16, ServerError> {
    bind_in_window(start).map(|(_listener, port)| port)
}

/// Bind the first free port in the search window, keeping the listener.
///
/// Binding directly (rather than probe-close-rebind) avoids the race where
/// another process grabs the port between probe and bind.
fn bind_in_window(start: u16) -> Result<(TcpListener, u16), ServerError> {
    let end = start.saturating_add(PORT_SEARCH_WINDOW);
    for port in start..end {
        match TcpListener::bind(("127.0.0.1", port)) {
            Ok(listener) => return Ok((listener, port)),
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => continue,
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => continue,
            Err(e) => return Err(ServerError::Bind(e)),
        }
    }
    Err(ServerError::NoAvailablePort { start, end })
}

// ============================================================================
// Accept loop and request handling
// ============================================================================

fn accept_loop(listener: TcpListener, stop_rx: Receiver<()>, root: PathBuf) {
    loop {
        if stop_rx.try_recv().is_ok() {
            break;
        }
        match listener.accept() {
            Ok((stream, _)) => {
                let root = root.clone();
                thread::spawn(move || handle_connection(stream, &root));
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(5));
            }
            Err(_) => break,
        }
    }
}

/// Serve a single connection. One request per connection, `Connection: close`.
fn handle_connection(mut stream: TcpStream, root: &Path) {
    let _ = stream.set_read_timeout(Some(CONNECTION_READ_TIMEOUT));
    let mut buf = [0u8; 4096];
    let n = match stream.read(&mut buf) {
        Ok(n) if n > 0 => n,
        _ => return,
    };
    let request = String::from_utf8_lossy(&buf[..n]);
    let raw_path = request.split_whitespace().nth(1).unwrap_or("/");

    let response = match resolve_request(root, raw_path) {
        Resolved::File(path) => match fs::read(&path) {
            Ok(body) => Response::ok(content_type_for(&path), body),
            Err(e) => {
                eprintln!("read failed for {}: {e}", path.display());
                Response::error(500, "Internal Server Error", "Internal server error")
            }
        },
        Resolved::Forbidden => Response::error(403, "Forbidden", "Forbidden"),
        Resolved::NotFound => Response::error(404, "Not Found", "File not found"),
        Resolved::DirWithoutIndex => {
            Response::error(404, "Not Found", "Directory listing not allowed")
        }
    };
    response.write_to(&mut stream);
}

/// Outcome of resolving an untrusted request path against the served root.
#[derive(Debug)]
enum Resolved {
    File(PathBuf),
    Forbidden,
    NotFound,
    DirWithoutIndex,
}

/// Resolve an untrusted URL path to a file within `root`.
///
/// `root` must already be canonical. Order matters: the containment check
/// runs on the canonical path before any filesystem content is touched.
fn resolve_request(root: &Path, raw_path: &str) -> Resolved {
    let without_query = raw_path.split(['?', '#']).next().unwrap_or("");
    let decoded = percent_decode_str(without_query).decode_utf8_lossy();

    let relative = if decoded == "/" {
        "index.html"
    } else {
        decoded.trim_start_matches('/')
    };

    // Lexical check first: `..` segments (or an absolute path smuggled in
    // via %2F) that escape the root are forbidden regardless of whether the
    // target exists. Checking existence first would let 403-vs-404 reveal
    // which files exist outside the root.
    if escapes_root(Path::new(relative)) {
        return Resolved::Forbidden;
    }

    let candidate = root.join(relative);
    let canonical = match fs::canonicalize(&candidate) {
        Ok(p) => p,
        Err(_) => return Resolved::NotFound,
    };

    // Canonical check still needed: symlinks escape without any `..`.
    if canonical != root && !canonical.starts_with(root) {
        return Resolved::Forbidden;
    }

    if canonical.is_dir() {
        let index = canonical.join("index.html");
        if index.is_file() {
            Resolved::File(index)
        } else {
            Resolved::DirWithoutIndex
        }
    } else {
        Resolved::File(canonical)
    }
}

/// True when a relative request path lexically points above its base:
/// absolute after decoding, or with more `..` segments than depth.
fn escapes_root(relative: &Path) -> bool {
    let mut depth: i32 = 0;
    for component in relative.components() {
        match component {
            std::path::Component::RootDir | std::path::Component::Prefix(_) => return true,
            std::path::Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            std::path::Component::Normal(_) => depth += 1,
            std::path::Component::CurDir => {}
        }
    }
    false
}

/// Static extension → MIME table. Unknown extensions fall back to
/// `application/octet-stream`.
fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",
        Some("xml") => "application/xml",
        _ => "application/octet-stream",
    }
}

struct Response {
    status: u16,
    reason: &'static str,
    content_type: &'static str,
    body: Vec<u8>,
}

impl Response {
    fn ok(content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            reason: "OK",
            content_type,
            body,
        }
    }

    fn error(status: u16, reason: &'static str, body: &str) -> Self {
        Self {
            status,
            reason,
            content_type: "text/plain; charset=utf-8",
            body: body.as_bytes().to_vec(),
        }
    }

    fn write_to(&self, stream: &mut TcpStream) {
        let header = format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n",
            self.status,
            self.reason,
            self.content_type,
            self.body.len()
        );
        let _ = stream.write_all(header.as_bytes());
        let _ = stream.write_all(&self.body);
    }
}
