//! Mock webhook server capturing alert deliveries

use serde_json::Value;
use std::sync::{Arc, Mutex};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, Request, ResponseTemplate,
};

#[derive(Debug, Clone)]
pub struct WebhookRequest {
    pub body: Value,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

pub struct MockWebhookServer {
    pub server: MockServer,
    pub base_url: String,
    captured_requests: Arc<Mutex<Vec<WebhookRequest>>>,
}

impl MockWebhookServer {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let base_url = server.uri();
        Self {
            server,
            base_url,
            captured_requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Accept and capture every delivery
    pub async fn mock_success(&self) {
        let requests = self.captured_requests.clone();

        Mock::given(method("POST"))
            .and(path("/webhook"))
            .respond_with(move |req: &Request| {
                if let Ok(body) = req.body_json::<Value>() {
                    requests.lock().unwrap().push(WebhookRequest {
                        body,
                        timestamp: chrono::Utc::now(),
                    });
                }
                ResponseTemplate::new(200)
            })
            .mount(&self.server)
            .await;
    }

    /// Capture every delivery but answer only after `delay`
    pub async fn mock_slow(&self, delay: std::time::Duration) {
        let requests = self.captured_requests.clone();

        Mock::given(method("POST"))
            .and(path("/webhook"))
            .respond_with(move |req: &Request| {
                if let Ok(body) = req.body_json::<Value>() {
                    requests.lock().unwrap().push(WebhookRequest {
                        body,
                        timestamp: chrono::Utc::now(),
                    });
                }
                ResponseTemplate::new(200).set_delay(delay)
            })
            .mount(&self.server)
            .await;
    }

    pub async fn mock_failure(&self, status_code: u16) {
        Mock::given(method("POST"))
            .and(path("/webhook"))
            .respond_with(ResponseTemplate::new(status_code))
            .mount(&self.server)
            .await;
    }

    pub fn get_captured_requests(&self) -> Vec<WebhookRequest> {
        self.captured_requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.captured_requests.lock().unwrap().len()
    }

    pub fn webhook_url(&self) -> String {
        format!("{}/webhook", self.base_url)
    }

    /// Any captured body whose string field `field` contains `needle`
    pub fn assert_sent_with(&self, field: &str, needle: &str) -> bool {
        self.get_captured_requests().iter().any(|req| {
            req.body
                .get(field)
                .and_then(|v| v.as_str())
                .map(|v| v.contains(needle))
                .unwrap_or(false)
        })
    }
}
