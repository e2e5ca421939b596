// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// A response the endpoint accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub status: u16,
    pub body: String,
}

/// Where the dispatcher sends its JSON payloads.
///
/// Implementations are called from many threads at once, one call per
/// request, and must not assume any ordering between calls.
pub trait Transport: Send + Sync {
    fn post_json(&self, url: &str, token: &str, body: &Value) -> Result<Delivery>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: HttpClient,
    timeout: Option<Duration>,
}

impl HttpTransport {
    /// `None` keeps the HTTP client's own default timeout.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = HttpClient::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("build HTTP client")?;
        Ok(Self { http, timeout })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl Transport for HttpTransport {
    fn post_json(&self, url: &str, token: &str, body: &Value) -> Result<Delivery> {
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .map_err(|error| connection_error(url, error))?;

        let status = response.status();
        let text = response.text().unwrap_or_default();
        if !status.is_success() {
            return Err(clean_error_response(status, &text));
        }

        Ok(Delivery {
            status: status.as_u16(),
            body: text,
        })
    }
}

fn connection_error(url: &str, error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!("request to {url} timed out -- raise [http].timeout or check the server");
    }
    anyhow!("cannot reach {url} -- check [http].endpoint and that the server is running ({error})")
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = parsed.error.or(parsed.message)
        && !message.is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), message);
    }

    if !body.is_empty() && body.len() < 100 && !body.contains('{') {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<String>,
    message: Option<String>,
}
