// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use fmdesk_app::{ConsoleError, ConsoleResult};
use url::Url;

/// Where requests go and who they act as. Built once and handed to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiContext {
    base_url: String,
    token: String,
    anonymous: bool,
}

impl ApiContext {
    pub fn new(base_url: &str, token: &str) -> ConsoleResult<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            token: token.trim().to_owned(),
            anonymous: false,
        })
    }

    /// Context that never sends an `Authorization` header.
    pub fn anonymous(base_url: &str) -> ConsoleResult<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            token: String::new(),
            anonymous: true,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }

    /// `Bearer <token>`, `None` for anonymous contexts, `MissingToken` when a token is required but empty.
    pub fn auth_header(&self) -> ConsoleResult<Option<String>> {
        if self.anonymous {
            return Ok(None);
        }
        if self.token.is_empty() {
            return Err(ConsoleError::MissingToken);
        }
        Ok(Some(format!("Bearer {}", self.token)))
    }

    pub fn url(&self, path: &str) -> ConsoleResult<Url> {
        let joined = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        Url::parse(&joined).map_err(|error| {
            ConsoleError::Config(format!("cannot build request URL {joined:?}: {error}"))
        })
    }
}

/// Trims, drops trailing slashes and assumes `https://` when no scheme is given.
pub fn normalize_base_url(raw: &str) -> ConsoleResult<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConsoleError::Config(
            "api.base_url must not be empty -- set it in the config file or FMDESK_BASE_URL"
                .to_owned(),
        ));
    }

    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_owned()
    } else {
        format!("https://{trimmed}")
    };

    Url::parse(&with_scheme).map_err(|error| {
        ConsoleError::Config(format!("api.base_url {raw:?} is not a valid URL: {error}"))
    })?;
    Ok(with_scheme)
}
