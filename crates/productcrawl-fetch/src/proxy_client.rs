//! Proxy-service HTTP client: POST the request payload, decode the JSON
//! response, and copy it into a `WebResponse`.

use crate::request::RequestPayload;
use productcrawl_types::WebResponse;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Body returned by the proxy router for one `/crawl/url` call.
#[derive(Debug, Clone, Default, Deserialize)]
struct ProxyResponse {
    #[serde(default)]
    status_code: i32,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    url: String,
    #[serde(default)]
    redirect_url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    cookie: String,
    #[serde(default)]
    time_taken: f64,
    #[serde(default)]
    error: String,
}

pub struct ProxyClient {
    client: reqwest::Client,
    proxy_router_addr: String,
}

impl ProxyClient {
    pub fn new(proxy_router_addr: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), proxy_router_addr: proxy_router_addr.into() }
    }

    /// Posts `payload` to the proxy router and returns the decoded
    /// `WebResponse`. Never returns `Err` for a failed fetch: network and
    /// decode failures are captured as a synthetic 500/408 `WebResponse`,
    /// classifying transport failures so the fetch loop only ever
    /// branches on status codes.
    pub async fn fetch(&self, payload: &RequestPayload) -> WebResponse {
        let start = Instant::now();
        info!(url = %payload.url, domain = %payload.domain, policy = %payload.request_policy, "PCREQUEST_START");

        let router_url = format!("http://{}/crawl/url", self.proxy_router_addr);
        let timeout = Duration::from_secs(u64::from(payload.timeout) + 5);

        let send_result = self
            .client
            .post(&router_url)
            .timeout(timeout)
            .json(payload)
            .send()
            .await;

        let http_response = match send_result {
            Ok(resp) => resp,
            Err(err) => return Self::copy_response(Self::error_response(&err.to_string(), &payload.url), payload.url.clone(), start),
        };

        let node_pool = http_response.headers().get("x-node-pool").and_then(|v| v.to_str().ok()).map(str::to_string);
        let render_pool = http_response.headers().get("x-render-pool").and_then(|v| v.to_str().ok()).map(str::to_string);

        let proxy_response: ProxyResponse = match http_response.json().await {
            Ok(body) => body,
            Err(err) => return Self::copy_response(Self::error_response(&err.to_string(), &payload.url), payload.url.clone(), start),
        };

        if !proxy_response.error.is_empty() {
            warn!(url = %payload.url, error = %proxy_response.error, "PCREQUEST_FAILED");
            return Self::copy_response(Self::error_response(&proxy_response.error, &payload.url), payload.url.clone(), start);
        }

        let mut web_response = Self::copy_response(proxy_response, payload.url.clone(), start);
        web_response.x_node_pool = node_pool;
        web_response.x_render_pool = render_pool;
        web_response
    }

    fn error_response(message: &str, url: &str) -> ProxyResponse {
        let is_timeout = message.to_lowercase().contains("timeout") || message.to_lowercase().contains("timed out");
        ProxyResponse {
            status_code: if is_timeout { 408 } else { 500 },
            success: false,
            error: format!("{message} for {url}"),
            ..Default::default()
        }
    }

    fn copy_response(proxy_response: ProxyResponse, request_url: String, start: Instant) -> WebResponse {
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        let url = if proxy_response.url.is_empty() { request_url.clone() } else { proxy_response.url };
        let redirect = if proxy_response.redirect_url.is_empty() { Some(request_url) } else { Some(proxy_response.redirect_url) };

        WebResponse {
            status: proxy_response.status_code,
            success: proxy_response.success,
            url,
            redirect,
            content: proxy_response.content.clone(),
            response_size: proxy_response.content.len(),
            time_taken: duration_ms,
            cookie: if proxy_response.cookie.is_empty() { None } else { Some(proxy_response.cookie) },
            screenshot_path: Vec::new(),
            x_node_pool: None,
            x_render_pool: None,
            error: if proxy_response.error.is_empty() { None } else { Some(proxy_response.error) },
        }
    }
}
