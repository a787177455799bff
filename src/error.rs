use thiserror::Error;

/// Everything that can go wrong between a user action and its notification.
///
/// None of these are fatal: the controller turns them into an error
/// notification and goes back to idle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// A required setting is missing or a feature is switched off.
    #[error("{0}")]
    Configuration(String),

    #[error("language detection failed: {0}")]
    Detection(String),

    /// Transport-level failure: DNS, TLS, timeout, connection reset.
    #[error("network error: {0}")]
    Network(String),

    /// The provider answered, but with a non-2xx status or a body we can't use.
    #[error("provider error: {0}")]
    Provider(String),

    #[error("the AI generated text in a different language ({found}, expected {expected}). Please try again.")]
    LanguageMismatch { expected: String, found: String },
}

impl AppError {
    /// Whether a secondary translation provider may be tried after this error.
    /// Configuration problems are never masked by a fallback.
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, AppError::Network(_) | AppError::Provider(_))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AppError::Provider(format!("malformed response: {}", e))
        } else if e.is_status() {
            AppError::Provider(e.to_string())
        } else {
            AppError::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_provider_and_network_errors_allow_fallback() {
        assert!(AppError::Network("timeout".into()).is_provider_failure());
        assert!(AppError::Provider("500".into()).is_provider_failure());
        assert!(!AppError::Configuration("no key".into()).is_provider_failure());
        assert!(!AppError::Detection("empty".into()).is_provider_failure());
    }

    #[test]
    fn mismatch_message_names_both_languages() {
        let e = AppError::LanguageMismatch { expected: "tr".into(), found: "en".into() };
        let msg = e.to_string();
        assert!(msg.contains("tr"));
        assert!(msg.contains("en"));
    }
    fn direct_client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    /// Answers a single request on a local port with `response`, verbatim.
    fn serve_once(response: &'static str) -> String {
        use std::io::{Read, Write};
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut chunk).unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            stream.write_all(response.as_bytes()).unwrap();
        });
        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn refused_connection_is_a_network_error() {
        let port = {
            let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let err = direct_client().get(format!("http://127.0.0.1:{}/", port)).send().await.unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Network(_)));
    }

    #[tokio::test]
    async fn error_status_is_a_provider_error() {
        let url = serve_once("HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        let resp = direct_client().get(url).send().await.unwrap();
        let err = resp.error_for_status().unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Provider(_)));
    }

    #[tokio::test]
    async fn undecodable_body_is_a_provider_error() {
        let url = serve_once("HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 8\r\nConnection: close\r\n\r\nnot json");
        let resp = direct_client().get(url).send().await.unwrap();
        let err = resp.json::<serde_json::Value>().await.unwrap_err();
        match AppError::from(err) {
            AppError::Provider(msg) => assert!(msg.starts_with("malformed response")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
