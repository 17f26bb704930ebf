//! `JamfClient` against a canned HTTP responder on localhost.
//!
//! Each test gets its own listener; the responder serves one request per
//! connection and records what it saw.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use jast_core::{LocalScript, ScriptId, ScriptMetadata, ScriptName};
use jast_remote::{ClientOptions, JamfClient, RemoteError, RemoteStore};

// ---------------------------------------------------------------------------
// Helper
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    target: String,
    headers: Vec<(String, String)>,
    body: String,
}

impl Recorded {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

type Log = Arc<Mutex<Vec<Recorded>>>;
type Routes = fn(&str, &str) -> (u16, String);

fn spawn_server(routes: Routes) -> (String, Log) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&log);

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let Some(request) = read_request(&mut stream) else {
                continue;
            };
            let path = request.target.split('?').next().unwrap_or_default().to_string();
            let (status, body) = routes(&request.method, &path);
            seen.lock().expect("log").push(request);
            let response = format!(
                "HTTP/1.1 {status} Status\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        }
    });

    (format!("http://{addr}"), log)
}

fn read_request(stream: &mut TcpStream) -> Option<Recorded> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();
    let length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + length {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let end = buf.len().min(header_end + length);
    let body = String::from_utf8_lossy(&buf[header_end..end]).to_string();

    Some(Recorded {
        method,
        target,
        headers,
        body,
    })
}

fn options(url: String) -> ClientOptions {
    ClientOptions {
        url,
        user: "api".to_string(),
        password: "secret".to_string(),
        timeout: Duration::from_secs(5),
        soft_delete_category: None,
    }
}

fn token_route(method: &str, path: &str) -> Option<(u16, String)> {
    (method == "POST" && path == "/uapi/auth/tokens")
        .then(|| (200, r#"{"token":"t0k","expires":"2030-01-01T00:00:00Z"}"#.to_string()))
}

fn not_found() -> (u16, String) {
    (404, r#"{"httpStatus":404}"#.to_string())
}

fn local(name: &str, category: &str) -> LocalScript {
    LocalScript {
        name: ScriptName::from(name),
        metadata: ScriptMetadata {
            category_name: category.to_string(),
            ..ScriptMetadata::default()
        },
        body: "#!/bin/bash\ndf -h\n".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn connect_uses_basic_auth_then_bearer_for_listing() {
    fn routes(method: &str, path: &str) -> (u16, String) {
        if let Some(r) = token_route(method, path) {
            return r;
        }
        match (method, path) {
            ("GET", "/uapi/v1/scripts") => (
                200,
                r#"{"totalCount":2,"results":[
                    {"id":"1","name":"a","scriptContents":"echo a\n"},
                    {"id":"2","name":"b","categoryName":"Maintenance"}
                ]}"#
                .to_string(),
            ),
            _ => not_found(),
        }
    }

    let (url, log) = spawn_server(routes);
    let client = JamfClient::connect(&options(url)).expect("connect");
    let scripts = client.list().expect("list");

    assert_eq!(scripts.len(), 2);
    assert_eq!(scripts[0].id, ScriptId(1));
    assert_eq!(scripts[0].body, "echo a\n");
    assert_eq!(scripts[1].metadata.category_name, "Maintenance");

    let log = log.lock().expect("log");
    assert_eq!(log[0].header("authorization"), Some("Basic YXBpOnNlY3JldA=="));
    assert_eq!(log[1].header("authorization"), Some("Bearer t0k"));
    assert!(log[1].target.contains("page=0"), "got {}", log[1].target);
}

#[test]
fn rejected_credentials_are_an_auth_error() {
    fn routes(_method: &str, _path: &str) -> (u16, String) {
        (401, r#"{"httpStatus":401}"#.to_string())
    }

    let (url, _log) = spawn_server(routes);
    let err = JamfClient::connect(&options(url)).unwrap_err();
    assert!(matches!(err, RemoteError::Auth { status: 401, .. }), "got {err}");
}

#[test]
fn create_resolves_category_and_returns_assigned_id() {
    fn routes(method: &str, path: &str) -> (u16, String) {
        if let Some(r) = token_route(method, path) {
            return r;
        }
        match (method, path) {
            ("GET", "/uapi/v1/categories") => (
                200,
                r#"{"totalCount":1,"results":[{"id":"4","name":"Maintenance","priority":9}]}"#
                    .to_string(),
            ),
            ("POST", "/uapi/v1/scripts") => {
                (201, r#"{"id":"101","href":"/v1/scripts/101"}"#.to_string())
            }
            _ => not_found(),
        }
    }

    let (url, log) = spawn_server(routes);
    let client = JamfClient::connect(&options(url)).expect("connect");
    let id = client.create(&local("check-disk", "Maintenance")).expect("create");
    assert_eq!(id, ScriptId(101));

    let log = log.lock().expect("log");
    let post = log
        .iter()
        .find(|r| r.method == "POST" && r.target == "/uapi/v1/scripts")
        .expect("create request");
    let body: serde_json::Value = serde_json::from_str(&post.body).expect("json body");
    assert_eq!(body["name"], "check-disk");
    assert_eq!(body["categoryId"], "4");
    assert_eq!(body["scriptContents"], "#!/bin/bash\ndf -h\n");
}

#[test]
fn unknown_category_fails_before_any_write() {
    fn routes(method: &str, path: &str) -> (u16, String) {
        if let Some(r) = token_route(method, path) {
            return r;
        }
        match (method, path) {
            ("GET", "/uapi/v1/categories") => {
                (200, r#"{"totalCount":0,"results":[]}"#.to_string())
            }
            _ => not_found(),
        }
    }

    let (url, log) = spawn_server(routes);
    let client = JamfClient::connect(&options(url)).expect("connect");
    let err = client.create(&local("x", "Missing")).unwrap_err();
    assert!(matches!(err, RemoteError::UnknownCategory(ref c) if c == "Missing"));
    assert!(log.lock().expect("log").iter().all(|r| r.method != "POST" || r.target.contains("auth")));
}

#[test]
fn history_note_failure_surfaces_status_and_body() {
    fn routes(method: &str, path: &str) -> (u16, String) {
        if let Some(r) = token_route(method, path) {
            return r;
        }
        match (method, path) {
            ("POST", "/uapi/v1/scripts/7/history") => {
                (500, r#"{"errors":["boom"]}"#.to_string())
            }
            _ => not_found(),
        }
    }

    let (url, log) = spawn_server(routes);
    let client = JamfClient::connect(&options(url)).expect("connect");
    let err = client.append_history_note(ScriptId(7), "abc123: fix").unwrap_err();
    match err {
        RemoteError::Status { status, body, .. } => {
            assert_eq!(status, 500);
            assert!(body.contains("boom"));
        }
        other => panic!("expected status error, got {other:?}"),
    }

    let log = log.lock().expect("log");
    let note = log.last().expect("history request");
    let body: serde_json::Value = serde_json::from_str(&note.body).expect("json body");
    assert_eq!(body["note"], "abc123: fix");
}
