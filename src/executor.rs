//! Sends the Flux query to InfluxDB.

use std::time::Duration;

/// Raw outcome of one query request.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryResponse {
    pub success: bool,
    /// CSV on success, diagnostic text otherwise.
    pub body: String,
}

impl QueryResponse {
    pub fn success(body: impl Into<String>) -> Self {
        QueryResponse {
            success: true,
            body: body.into(),
        }
    }

    pub fn failure(body: impl Into<String>) -> Self {
        QueryResponse {
            success: false,
            body: body.into(),
        }
    }
}

/// Runs a Flux query and hands back the raw response.
pub trait QueryExecutor {
    fn execute(&self, query: &str) -> QueryResponse;
}

/// Connection settings for the InfluxDB query API.
#[derive(Clone, Debug)]
pub struct Endpoint {
    pub url: String,
    pub org: String,
    pub token: String,
    pub timeout: Option<Duration>,
}

/// Executes queries with a blocking POST to `<url>/api/v2/query`.
///
/// Only 2xx responses count as success. Error statuses carry the response body (or `HTTP <code>`
/// if the body is empty), transport errors carry the error text.
pub struct HttpExecutor {
    agent: ureq::Agent,
    endpoint: Endpoint,
}

impl HttpExecutor {
    pub fn new(endpoint: Endpoint) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = endpoint.timeout {
            builder = builder.timeout(timeout);
        }

        HttpExecutor {
            agent: builder.build(),
            endpoint,
        }
    }

    fn query_url(&self) -> String {
        format!("{}/api/v2/query", self.endpoint.url.trim_end_matches('/'))
    }
}

impl QueryExecutor for HttpExecutor {
    fn execute(&self, query: &str) -> QueryResponse {
        let url = self.query_url();
        log::debug!("POST {} (org {})", url, self.endpoint.org);

        let result = self
            .agent
            .post(&url)
            .query("org", &self.endpoint.org)
            .set("Authorization", &format!("Token {}", self.endpoint.token))
            .set("Accept", "application/csv")
            .set("Content-Type", "application/vnd.flux")
            .send_string(query);

        match result {
            Ok(response) => {
                log::debug!("InfluxDB answered with status {}", response.status());
                match response.into_string() {
                    Ok(body) => QueryResponse::success(body),
                    Err(err) => QueryResponse::failure(format!("failed to read response: {err}")),
                }
            }
            Err(ureq::Error::Status(status, response)) => {
                log::info!("InfluxDB answered with error status {status}");
                let body = response.into_string().unwrap_or_default();
                if body.trim().is_empty() {
                    QueryResponse::failure(format!("HTTP {status}"))
                } else {
                    QueryResponse::failure(body)
                }
            }
            Err(ureq::Error::Transport(transport)) => {
                log::info!("request to {url} failed: {transport}");
                QueryResponse::failure(transport.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    use super::*;

    fn endpoint(url: String) -> Endpoint {
        Endpoint {
            url,
            org: "my-org".to_owned(),
            token: "s3cr3t".to_owned(),
            timeout: Some(Duration::from_secs(1)),
        }
    }

    /// Accepts a single connection, answers it with `status_line` and `body` and reports the
    /// raw request it received.
    fn serve_once(status_line: &'static str, body: &'static str) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            let response = format!(
                "{status_line}\r\nContent-Type: application/csv\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            let _ = tx.send(request);
        });

        (url, rx)
    }

    fn read_request(stream: &mut impl Read) -> String {
        let mut raw = Vec::new();
        let mut buf = [0u8; 1024];

        loop {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);

            let text = String::from_utf8_lossy(&raw).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if raw.len() >= header_end + 4 + content_length {
                    return text;
                }
            }
        }

        String::from_utf8_lossy(&raw).to_string()
    }

    #[test]
    fn test_execute_success() -> anyhow::Result<()> {
        let (url, requests) = serve_once("HTTP/1.1 200 OK", ",result,_value\r\n,_result,1\r\n");
        let executor = HttpExecutor::new(endpoint(url));

        let response = executor.execute("from(bucket: \"b\")");
        assert_eq!(response, QueryResponse::success(",result,_value\r\n,_result,1\r\n"));

        let request = requests.recv()?;
        let lowercase = request.to_lowercase();
        assert!(request.starts_with("POST /api/v2/query?org=my-org HTTP/1.1"));
        assert!(lowercase.contains("authorization: token s3cr3t"));
        assert!(lowercase.contains("accept: application/csv"));
        assert!(lowercase.contains("content-type: application/vnd.flux"));
        assert!(request.ends_with("from(bucket: \"b\")"));
        Ok(())
    }

    #[test]
    fn test_execute_error_status() {
        let body = "{\"code\":\"invalid\",\"message\":\"compilation failed\"}";
        let (url, _requests) = serve_once("HTTP/1.1 400 Bad Request", body);
        let executor = HttpExecutor::new(endpoint(url));

        assert_eq!(executor.execute("bad"), QueryResponse::failure(body));
    }

    #[test]
    fn test_execute_error_status_without_body() {
        let (url, _requests) = serve_once("HTTP/1.1 503 Service Unavailable", "");
        let executor = HttpExecutor::new(endpoint(url));

        assert_eq!(executor.execute("q"), QueryResponse::failure("HTTP 503"));
    }

    #[test]
    fn test_execute_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let response = HttpExecutor::new(endpoint(url)).execute("q");
        assert!(!response.success);
        assert!(!response.body.is_empty());
    }

    #[test]
    fn test_execute_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        // accept but never answer
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_secs(3));
            drop(stream);
        });

        let response = HttpExecutor::new(endpoint(url)).execute("q");
        assert!(!response.success);
        handle.join().unwrap();
    }

    #[test]
    fn test_query_url_trims_trailing_slash() {
        let executor = HttpExecutor::new(endpoint("http://influx:8086/".to_owned()));
        assert_eq!(executor.query_url(), "http://influx:8086/api/v2/query");
    }
}
