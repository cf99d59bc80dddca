use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::error::LinkCheckError;

/// Confirms a freshly signed URL is accepted by the server before it is
/// handed out, so a key mismatch shows up at issuance time.
pub struct LinkChecker {
    client: Client,
}

impl LinkChecker {
    pub fn new() -> Result<Self, LinkCheckError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("rserve/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// HEAD the URL. On anything but 200, GET it; the body is only read when
    /// the GET fails too.
    pub async fn check(&self, url: &str) -> Result<(), LinkCheckError> {
        let response = self.client.head(url).send().await?;
        if response.status() == StatusCode::OK {
            tracing::debug!(url, "Signed URL accepted by server");
            return Ok(());
        }

        // Some proxies refuse HEAD; a successful GET still counts
        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::OK {
            tracing::debug!(url, "Signed URL accepted by server on GET");
            return Ok(());
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        tracing::warn!(url, status, "Signed URL rejected by server");
        Err(LinkCheckError::Rejected {
            status,
            body: body.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    #[tokio::test]
    async fn test_check_accepts_200_head() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/docs/report.pdf"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let checker = LinkChecker::new().unwrap();
        let url = format!("{}/docs/report.pdf?expires_at=1&signature=x", server.uri());
        checker.check(&url).await.unwrap();
    }

    #[tokio::test]
    async fn test_check_reports_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/docs/report.pdf"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/docs/report.pdf"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string("Signature verification failed\n"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let checker = LinkChecker::new().unwrap();
        let url = format!("{}/docs/report.pdf?expires_at=1&signature=x", server.uri());
        let err = checker.check(&url).await.unwrap_err();

        match err {
            LinkCheckError::Rejected { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "Signature verification failed");
            }
            other => panic!("Expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_check_accepts_200_get_after_refused_head() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/docs/report.pdf"))
            .respond_with(ResponseTemplate::new(405))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/docs/report.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 4096]))
            .expect(1)
            .mount(&server)
            .await;

        let checker = LinkChecker::new().unwrap();
        let url = format!("{}/docs/report.pdf?expires_at=1&signature=x", server.uri());
        checker.check(&url).await.unwrap();
    }

    #[tokio::test]
    async fn test_check_unreachable_server() {
        // Grab a free port, then close it so nothing listens there
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let checker = LinkChecker::new().unwrap();
        let err = checker
            .check(&format!("http://127.0.0.1:{port}/docs/report.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, LinkCheckError::Request(_)));
    }
}
