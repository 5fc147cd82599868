// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

pub const GENERIC_FAILURE: &str = "request failed";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsoleError {
    #[error("cannot reach {url} -- check [api].base_url and your network ({message})")]
    Transport { url: String, message: String },

    #[error("server error ({status}): {message}")]
    Request { status: u16, message: String },

    #[error("backend rejected the request (code {code}): {message}")]
    Application { code: i64, message: String },

    #[error("unexpected response shape: expected {expected}")]
    Shape { expected: String },

    #[error("{0}")]
    Validation(String),

    #[error("authentication token missing -- set [api].token or FMDESK_TOKEN and retry")]
    MissingToken,

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type ConsoleResult<T> = Result<T, ConsoleError>;

impl ConsoleError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn shape(expected: impl Into<String>) -> Self {
        Self::Shape {
            expected: expected.into(),
        }
    }

    /// HTTP status for request failures, `None` for everything else.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Text suitable for a one-line toast: the backend's own message when it sent one.
    pub fn user_message(&self) -> String {
        match self {
            Self::Request { message, .. } | Self::Application { message, .. } => {
                if message.trim().is_empty() {
                    GENERIC_FAILURE.to_owned()
                } else {
                    message.clone()
                }
            }
            other => other.to_string(),
        }
    }
}
