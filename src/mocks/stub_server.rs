// This file is only compiled during tests

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
}

struct Shared {
    state: Mutex<String>,
    requests: Mutex<Vec<RecordedRequest>>,
    // Answer this many requests with 500 before behaving normally.
    failures_left: Mutex<u32>,
    unresponsive: AtomicBool,
    shutdown: AtomicBool,
}

/// Minimal plain-text state store speaking just enough HTTP/1.1 for the
/// `/simple/read` and `/simple/write/<token>` routes.
pub struct StubServer {
    addr: SocketAddr,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl StubServer {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        let addr = listener.local_addr().expect("stub server address");
        let shared = Arc::new(Shared {
            state: Mutex::new("low".to_string()),
            requests: Mutex::new(Vec::new()),
            failures_left: Mutex::new(0),
            unresponsive: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
        });

        let worker = Arc::clone(&shared);
        let handle = thread::spawn(move || {
            // Hung connections are parked here so the client sees no reply.
            let mut parked = Vec::new();
            for stream in listener.incoming() {
                if worker.shutdown.load(Ordering::SeqCst) {
                    break;
                }
                let Ok(stream) = stream else { continue };
                if worker.unresponsive.load(Ordering::SeqCst) {
                    parked.push(stream);
                    continue;
                }
                serve(stream, &worker);
            }
        });

        Self {
            addr,
            shared,
            handle: Some(handle),
        }
    }

    /// Start a server that accepts connections but never answers.
    pub fn unresponsive() -> Self {
        let server = Self::start();
        server.shared.unresponsive.store(true, Ordering::SeqCst);
        server
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn fail_next(&self, count: u32) {
        *self.shared.failures_left.lock().unwrap() = count;
    }

    pub fn state(&self) -> String {
        self.shared.state.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.shared.requests.lock().unwrap().clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        // Wake the accept loop.
        let _ = TcpStream::connect(self.addr);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve(stream: TcpStream, shared: &Shared) {
    let mut reader = BufReader::new(match stream.try_clone() {
        Ok(s) => s,
        Err(_) => return,
    });

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).unwrap_or(0) == 0 {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).unwrap_or(0) == 0 || header == "\r\n" {
            break;
        }
        if let Some((name, value)) = header.split_once(':')
            && name.eq_ignore_ascii_case("content-length")
        {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }
    let mut body = vec![0u8; content_length];
    let _ = reader.read_exact(&mut body);

    shared.requests.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
    });

    let (status, reply) = {
        let mut failures = shared.failures_left.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            ("500 Internal Server Error", "stub failure".to_string())
        } else {
            route(&method, &path, shared)
        }
    };

    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{reply}",
        reply.len()
    );
    let mut stream = stream;
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

fn route(method: &str, path: &str, shared: &Shared) -> (&'static str, String) {
    match (method, path) {
        ("GET", "/simple/read") => ("200 OK", shared.state.lock().unwrap().clone()),
        ("PUT", p) if p.starts_with("/simple/write/") => {
            let token = p.trim_start_matches("/simple/write/").to_string();
            *shared.state.lock().unwrap() = token.clone();
            ("200 OK", token)
        }
        _ => ("404 Not Found", "not found".to_string()),
    }
}
