// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod context;
pub mod envelope;
mod list;
mod mutation;

pub use context::{ApiContext, normalize_base_url};

use fmdesk_app::{
    ConsoleError, ConsoleResult, EntityId, ListPage, MutationOutcome, MutationRequest,
    QueryState, ResourceBackend, ResourceKind,
};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct Client {
    context: ApiContext,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(context: ApiContext, timeout: Duration) -> ConsoleResult<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| ConsoleError::Config(format!("build HTTP client: {error}")))?;

        Ok(Self {
            context,
            timeout,
            http,
        })
    }

    pub fn context(&self) -> &ApiContext {
        &self.context
    }

    pub fn base_url(&self) -> &str {
        self.context.base_url()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn authorized(&self, request: RequestBuilder) -> ConsoleResult<RequestBuilder> {
        Ok(match self.context.auth_header()? {
            Some(header) => request.header(reqwest::header::AUTHORIZATION, header),
            None => request,
        })
    }

    /// Sends one request and returns the decoded body of a successful response.
    /// Non-2xx statuses become `Request` errors with the backend's message or `fallback`.
    fn send(
        &self,
        method: &str,
        url: &str,
        request: RequestBuilder,
        fallback: &str,
    ) -> ConsoleResult<(u16, Value)> {
        let request =
            self.authorized(request.header(reqwest::header::ACCEPT, "application/json"))?;
        let response = request
            .send()
            .map_err(|error| connection_error(self.context.base_url(), error))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            debug!(method, url, status = status.as_u16(), bytes = text.len(), "error response");
            return Err(clean_error_response(status, &text, fallback));
        }

        let text = response
            .text()
            .map_err(|error| connection_error(self.context.base_url(), error))?;
        debug!(method, url, status = status.as_u16(), bytes = text.len(), "response");
        Ok((status.as_u16(), parse_body(&text)))
    }
}

impl ResourceBackend for Client {
    fn list(&self, kind: ResourceKind, query: &QueryState) -> ConsoleResult<ListPage<Value>> {
        self.fetch(kind, query)
    }

    fn get(&self, kind: ResourceKind, id: EntityId) -> ConsoleResult<Value> {
        self.fetch_one(kind, id)
    }

    fn mutate(
        &self,
        kind: ResourceKind,
        request: &MutationRequest,
    ) -> ConsoleResult<MutationOutcome> {
        self.perform(kind, request)
    }
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned()))
}

fn connection_error(base_url: &str, error: reqwest::Error) -> ConsoleError {
    ConsoleError::Transport {
        url: base_url.to_owned(),
        message: error.to_string(),
    }
}

fn clean_error_response(status: StatusCode, body: &str, fallback: &str) -> ConsoleError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|parsed| envelope::error_message(&parsed))
        .or_else(|| {
            let trimmed = body.trim();
            let plain = !trimmed.is_empty()
                && trimmed.len() < 100
                && !trimmed.contains('<')
                && !trimmed.contains('{');
            plain.then(|| trimmed.to_owned())
        })
        .unwrap_or_else(|| fallback.to_owned());

    ConsoleError::Request {
        status: status.as_u16(),
        message,
    }
}
