use super::context::{HeaderList, HttpResponse, RequestMethod};
use crate::config::HttpConfig;
use crate::{Error, Result};
use std::time::Duration;

/// An outbound request as assembled from a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: RequestMethod,
    pub url: String,
    pub headers: HeaderList,
    /// Per-request bound; `None` leaves the transport's default in place.
    pub timeout: Option<Duration>,
}

/// Blocking HTTP client used by `BeginRequest`.
///
/// Implementations send whatever method the request carries. `HttpC` only
/// hands GET requests to its transport.
pub trait HttpTransport: Send {
    /// Send `request` and collect the full response.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// [`HttpTransport`] backed by `reqwest`'s blocking client.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Build a client with the timeout, redirect limit and user agent from
    /// `config`.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        // No proxy is ever used, the host environment's included.
        let mut builder = reqwest::blocking::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects));
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }
        let client = builder.build().map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let method = match request.method {
            RequestMethod::Get => reqwest::Method::GET,
            RequestMethod::Post => reqwest::Method::POST,
            RequestMethod::Head => reqwest::Method::HEAD,
            RequestMethod::Put => reqwest::Method::PUT,
            RequestMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, request.url.as_str());
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().map_err(|e| {
            tracing::error!("HTTP request to {} failed: {}", request.url, e);
            Error::Http(e.to_string())
        })?;

        let status_code = u32::from(response.status().as_u16());
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .map_err(|e| Error::Http(e.to_string()))?
            .to_vec();

        Ok(HttpResponse {
            status_code,
            headers,
            body,
        })
    }
}
