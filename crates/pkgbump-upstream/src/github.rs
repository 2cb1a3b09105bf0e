use crate::{ReleaseSource, UpstreamConfig, UpstreamError};
use pkgbump_schema::{is_safe_token, ReleaseOrigin, ValidationError};
use std::io::Read;

/// Latest-release lookup against a GitHub-compatible REST API:
/// `GET {api_url}/repos/{owner}/{repo}/releases/latest`, reading `tag_name`.
pub struct GithubReleases {
    config: UpstreamConfig,
    owner: String,
    repo: String,
    agent: ureq::Agent,
}

impl GithubReleases {
    /// `owner` and `repo` end up in a URL path, so they are whitelisted here.
    pub fn new(config: UpstreamConfig, owner: &str, repo: &str) -> Result<Self, UpstreamError> {
        for (kind, value) in [("upstream owner", owner), ("upstream repo", repo)] {
            if !is_safe_token(value) {
                return Err(ValidationError::UnsafeIdentifier {
                    kind,
                    value: value.to_owned(),
                }
                .into());
            }
        }
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout()))
            .build()
            .into();
        Ok(Self {
            config,
            owner: owner.to_owned(),
            repo: repo.to_owned(),
            agent,
        })
    }

    pub fn url(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            self.config.api_url, self.owner, self.repo
        )
    }

    fn do_get(&self, url: &str) -> Result<Vec<u8>, UpstreamError> {
        let mut req = self
            .agent
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", concat!("pkgbump/", env!("CARGO_PKG_VERSION")));
        if let Some(ref token) = self.config.auth_token {
            req = req.header("Authorization", &format!("Bearer {token}"));
        }
        let resp = match req.call() {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(code)) => {
                return Err(UpstreamError::Http(format!("HTTP {code} for {url}")));
            }
            Err(e) => return Err(UpstreamError::Http(e.to_string())),
        };

        let mut reader = resp.into_body().into_reader();
        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .map_err(|e| UpstreamError::Http(e.to_string()))?;
        Ok(body)
    }
}

/// Pull the non-empty `tag_name` string out of a release descriptor.
pub fn parse_tag_name(body: &[u8]) -> Result<String, UpstreamError> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| UpstreamError::Malformed(e.to_string()))?;
    match value.get("tag_name") {
        Some(serde_json::Value::String(tag)) if !tag.trim().is_empty() => Ok(tag.clone()),
        Some(_) => Err(UpstreamError::Malformed(
            "'tag_name' is empty or not a string".to_owned(),
        )),
        None => Err(UpstreamError::Malformed("no 'tag_name' field".to_owned())),
    }
}

impl ReleaseSource for GithubReleases {
    fn describe(&self) -> String {
        format!("github:{}/{}", self.owner, self.repo)
    }

    fn origin(&self) -> ReleaseOrigin {
        ReleaseOrigin::Api
    }

    fn latest_tag(&self) -> Result<String, UpstreamError> {
        let url = self.url();
        tracing::debug!("GET {url}");
        let body = self.do_get(&url)?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(UpstreamError::EmptyResponse(url));
        }
        let tag = parse_tag_name(&body)?;
        tracing::debug!("{} latest tag: {tag}", self.describe());
        Ok(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};

    /// A captured HTTP request for header inspection.
    #[derive(Debug, Clone)]
    struct CapturedRequest {
        path: String,
        headers: HashMap<String, String>,
    }

    /// Serves one canned response to every request.
    struct MockServer {
        addr: String,
        _handle: std::thread::JoinHandle<()>,
        requests: Arc<Mutex<Vec<CapturedRequest>>>,
    }

    impl MockServer {
        fn start(status: u16, body: &str) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = format!("http://{}", listener.local_addr().unwrap());
            let requests: Arc<Mutex<Vec<CapturedRequest>>> = Arc::new(Mutex::new(Vec::new()));
            let body = body.to_owned();

            let requests_clone = Arc::clone(&requests);
            let handle = std::thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(mut stream) = stream else { break };
                    let mut reader = BufReader::new(stream.try_clone().unwrap());
                    let mut request_line = String::new();
                    if reader.read_line(&mut request_line).is_err() {
                        continue;
                    }
                    let path = request_line
                        .split_whitespace()
                        .nth(1)
                        .unwrap_or_default()
                        .to_owned();

                    let mut headers = HashMap::new();
                    loop {
                        let mut line = String::new();
                        if reader.read_line(&mut line).is_err() || line.trim().is_empty() {
                            break;
                        }
                        if let Some((k, v)) = line.trim().split_once(": ") {
                            headers.insert(k.to_lowercase(), v.to_owned());
                        }
                    }
                    requests_clone
                        .lock()
                        .unwrap()
                        .push(CapturedRequest { path, headers });

                    let response = format!(
                        "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = stream.write_all(response.as_bytes());
                    let _ = stream.flush();
                }
            });

            MockServer {
                addr,
                _handle: handle,
                requests,
            }
        }

        fn captured_requests(&self) -> Vec<CapturedRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    fn source(url: &str) -> GithubReleases {
        GithubReleases::new(UpstreamConfig::new(url), "foo", "bar").unwrap()
    }

    #[test]
    fn parse_tag_name_extracts_tag() {
        let body = br#"{"tag_name":"v1.1.0","name":"Release 1.1.0","draft":false}"#;
        assert_eq!(parse_tag_name(body).unwrap(), "v1.1.0");
    }

    #[test]
    fn parse_tag_name_rejects_missing_and_non_string() {
        assert!(matches!(
            parse_tag_name(br#"{"name":"x"}"#),
            Err(UpstreamError::Malformed(_))
        ));
        assert!(matches!(
            parse_tag_name(br#"{"tag_name":42}"#),
            Err(UpstreamError::Malformed(_))
        ));
        assert!(matches!(
            parse_tag_name(br#"{"tag_name":""}"#),
            Err(UpstreamError::Malformed(_))
        ));
        assert!(matches!(
            parse_tag_name(b"<html>rate limited</html>"),
            Err(UpstreamError::Malformed(_))
        ));
    }

    #[test]
    fn parse_tag_name_returns_raw_tag() {
        // Validation is the caller's job; the raw tag is passed through.
        let body = br#"{"tag_name":"v1.2.3-evil;rm"}"#;
        assert_eq!(parse_tag_name(body).unwrap(), "v1.2.3-evil;rm");
    }

    #[test]
    fn fetches_latest_tag() {
        let server = MockServer::start(200, r#"{"tag_name":"v1.1.0"}"#);
        let tag = source(&server.addr).latest_tag().unwrap();
        assert_eq!(tag, "v1.1.0");

        let reqs = server.captured_requests();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].path, "/repos/foo/bar/releases/latest");
        assert_eq!(
            reqs[0].headers.get("accept").map(String::as_str),
            Some("application/vnd.github+json")
        );
        assert!(reqs[0].headers.contains_key("user-agent"));
        assert!(!reqs[0].headers.contains_key("authorization"));
    }

    #[test]
    fn auth_token_sent_as_bearer_header() {
        let server = MockServer::start(200, r#"{"tag_name":"1.0"}"#);
        let config = UpstreamConfig::new(&server.addr).with_token("secret-token-42");
        let src = GithubReleases::new(config, "foo", "bar").unwrap();
        src.latest_tag().unwrap();

        let reqs = server.captured_requests();
        assert_eq!(
            reqs[0].headers.get("authorization").map(String::as_str),
            Some("Bearer secret-token-42")
        );
    }

    #[test]
    fn http_error_status_fails() {
        let server = MockServer::start(404, r#"{"message":"Not Found"}"#);
        let err = source(&server.addr).latest_tag().unwrap_err();
        assert!(matches!(err, UpstreamError::Http(ref m) if m.contains("404")));
    }

    #[test]
    fn empty_body_fails() {
        let server = MockServer::start(200, "");
        let err = source(&server.addr).latest_tag().unwrap_err();
        assert!(matches!(err, UpstreamError::EmptyResponse(_)));
    }

    #[test]
    fn connection_refused_fails() {
        let err = source("http://127.0.0.1:1").latest_tag().unwrap_err();
        assert!(matches!(err, UpstreamError::Http(_)));
    }

    #[test]
    fn url_layout() {
        let src = source("https://api.example.com");
        assert_eq!(src.url(), "https://api.example.com/repos/foo/bar/releases/latest");
    }

    #[test]
    fn rejects_unsafe_identifiers() {
        assert!(GithubReleases::new(UpstreamConfig::default(), "foo", "bar?x=1").is_err());
        assert!(GithubReleases::new(UpstreamConfig::default(), "", "bar").is_err());
    }
}
