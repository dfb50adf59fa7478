//! Plain HTTP/1.1 client for the scenario service.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::{parse_payload, ProviderError, ProviderPayload, ScenarioContext, ScenarioProvider};

pub const DEFAULT_PORT: u16 = 8787;
pub const SCENARIO_PATH: &str = "/api/scenario";

const SINGLE_TIMEOUT: Duration = Duration::from_millis(6_000);
const BATCH_TIMEOUT: Duration = Duration::from_millis(8_000);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_RESPONSE_BYTES: u64 = 1_048_576;

/// Parse a host string like "http://127.0.0.1:8787", "https://example.com:8080",
/// or "127.0.0.1" into (hostname, port). Defaults to port 8787.
pub fn parse_host(host: &str) -> Result<(String, u16), ProviderError> {
    let trimmed = host.trim().trim_end_matches('/');
    let h = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    let h = h.split('/').next().unwrap_or(h);
    let mut parts = h.split(':');
    let hostname = parts.next().unwrap_or("").trim().to_string();
    if hostname.is_empty() {
        return Err(ProviderError::InvalidAddress(host.to_string()));
    }
    let port = match parts.next() {
        Some(port) => port
            .trim()
            .parse::<u16>()
            .map_err(|_| ProviderError::InvalidAddress(host.to_string()))?,
        None => DEFAULT_PORT,
    };
    Ok((hostname, port))
}

/// Status code of a 2xx status line; anything else is an error.
pub fn parse_http_status(status_line: &str) -> Result<u16, ProviderError> {
    let parts: Vec<&str> = status_line.splitn(3, ' ').collect();
    if parts.len() < 2 {
        return Err(ProviderError::MalformedResponse(
            "invalid HTTP status line".to_string(),
        ));
    }
    let code: u16 = parts[1]
        .parse()
        .map_err(|_| ProviderError::MalformedResponse("invalid HTTP status code".to_string()))?;
    if (200..300).contains(&code) {
        Ok(code)
    } else {
        Err(ProviderError::Status {
            code,
            reason: parts.get(2).copied().unwrap_or("Unknown").trim().to_string(),
        })
    }
}

fn extract_json_body(body: &str) -> Option<&str> {
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&body[start..=end])
}

/// Scenario service reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpScenarioProvider {
    hostname: String,
    port: u16,
}

impl HttpScenarioProvider {
    pub fn new(base_url: &str) -> Result<Self, ProviderError> {
        let (hostname, port) = parse_host(base_url)?;
        Ok(Self { hostname, port })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }

    fn resolve(&self) -> Result<SocketAddr, ProviderError> {
        (self.hostname.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|_| ProviderError::Resolve {
                host: self.hostname.clone(),
            })?
            .next()
            .ok_or_else(|| ProviderError::Resolve {
                host: self.hostname.clone(),
            })
    }

    /// One POST of `{"context": ...}`, bounded by the request-type timeout.
    pub fn fetch(&self, context: &ScenarioContext) -> Result<ProviderPayload, ProviderError> {
        let timeout = if context.is_batch() {
            BATCH_TIMEOUT
        } else {
            SINGLE_TIMEOUT
        };
        let body = serde_json::json!({ "context": context }).to_string();

        let addr = self.resolve()?;
        let mut stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT.min(timeout))?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;

        let req = format!(
            "POST {} HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            SCENARIO_PATH,
            self.hostname,
            body.len(),
            body
        );
        stream.write_all(req.as_bytes())?;

        let mut raw = String::new();
        stream.take(MAX_RESPONSE_BYTES).read_to_string(&mut raw)?;

        let first_line = raw
            .lines()
            .next()
            .ok_or_else(|| ProviderError::MalformedResponse("empty response".to_string()))?;
        parse_http_status(first_line)?;

        let (_, body) = raw
            .split_once("\r\n\r\n")
            .ok_or_else(|| ProviderError::MalformedResponse("missing body".to_string()))?;
        let json = extract_json_body(body)
            .ok_or_else(|| ProviderError::MalformedResponse("body is not JSON".to_string()))?;

        parse_payload(json, context.phase())
    }
}

impl ScenarioProvider for HttpScenarioProvider {
    fn name(&self) -> &'static str {
        "http"
    }

    fn request(&self, context: &ScenarioContext) -> Option<ProviderPayload> {
        match self.fetch(context) {
            Ok(payload) => {
                tracing::debug!(
                    target: "leadsim::provider",
                    address = %self.address(),
                    turn = context.turn,
                    "provider.request_ok"
                );
                Some(payload)
            }
            Err(err) => {
                tracing::warn!(
                    target: "leadsim::provider",
                    address = %self.address(),
                    turn = context.turn,
                    error = %err,
                    "provider.request_failed"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::thread;

    use super::*;
    use crate::provider::RequestType;
    use crate::state::GameState;

    #[test]
    fn test_parse_host_with_http_prefix() {
        let (h, p) = parse_host("http://127.0.0.1:9000").unwrap();
        assert_eq!(h, "127.0.0.1");
        assert_eq!(p, 9000);
    }

    #[test]
    fn test_parse_host_default_port() {
        let (h, p) = parse_host("localhost/").unwrap();
        assert_eq!(h, "localhost");
        assert_eq!(p, DEFAULT_PORT);
    }

    #[test]
    fn test_parse_host_rejects_garbage() {
        assert!(parse_host("http://").is_err());
        assert!(parse_host("host:port").is_err());
    }

    #[test]
    fn test_parse_http_status_ok() {
        assert_eq!(parse_http_status("HTTP/1.1 200 OK").unwrap(), 200);
        assert_eq!(parse_http_status("HTTP/1.1 204 No Content").unwrap(), 204);
    }

    #[test]
    fn test_parse_http_status_error() {
        let err = parse_http_status("HTTP/1.1 503 Service Unavailable").unwrap_err();
        assert!(matches!(err, ProviderError::Status { code: 503, .. }));
        assert!(parse_http_status("garbage").is_err());
    }

    #[test]
    fn test_unreachable_service_yields_none() {
        let provider = HttpScenarioProvider::new("192.0.2.1:1").unwrap();
        let context = ScenarioContext::from_state(&GameState::default(), None);
        assert!(provider.request(&context).is_none());
    }

    fn serve_once(status: &'static str, body: &'static str) -> (u16, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some((head, body)) = text.split_once("\r\n\r\n") {
                    let length = head
                        .lines()
                        .find_map(|line| line.strip_prefix("Content-Length: "))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if body.len() >= length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&request).to_string()
        });
        (port, handle)
    }

    #[test]
    fn posts_context_and_parses_reply() {
        let (port, server) = serve_once(
            "200 OK",
            r#"{"id": "svc-1", "scenario": {"title": "From the service", "options": {
                "a": {"immediate": {"company.velocity": 2, "leader.trust": -1}}}}}"#,
        );
        let provider = HttpScenarioProvider::new(&format!("http://127.0.0.1:{port}")).unwrap();
        let context = ScenarioContext::from_state(&GameState::default(), None)
            .with_request_type(RequestType::Single);

        let payload = provider.request(&context).unwrap();
        let request = server.join().unwrap();

        assert!(request.starts_with("POST /api/scenario HTTP/1.1"));
        assert!(request.contains("\"context\""));
        assert!(request.contains("\"requestType\":\"single\""));
        let scenarios = payload.into_scenarios();
        assert_eq!(scenarios[0].id, "svc-1");
        assert_eq!(scenarios[0].scenario.title, "From the service");
    }

    #[test]
    fn error_status_yields_none() {
        let (port, server) = serve_once("500 Internal Server Error", r#"{"error": "boom"}"#);
        let provider = HttpScenarioProvider::new(&format!("127.0.0.1:{port}")).unwrap();
        let context = ScenarioContext::from_state(&GameState::default(), None);
        assert!(provider.request(&context).is_none());
        server.join().unwrap();
    }
}
