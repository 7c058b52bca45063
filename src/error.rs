// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{io, result};

use reqwest::StatusCode;
use thiserror::Error;

pub(crate) type Result<T, E = Error> = result::Result<T, E>;

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("IO operation failed: {0}")]
    Io(#[from] io::Error),
    #[error("JSON format error: {0}")]
    Json(serde_json::Error),
    #[error("configuration error: {0}")]
    Config(#[from] Config),
    #[error("credential error: {0}")]
    Credential(#[from] Credential),
    #[error("signing error: {0}")]
    Signing(#[from] Signing),
    #[error("DNS provider API error: {0}")]
    ProviderApi(#[from] ProviderApi),
    #[error("secret store error: {0}")]
    SecretStore(#[from] SecretStore),
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        // LINT: Deliberate fall-through that should catch future cases added to
        // the enum.
        #[allow(clippy::wildcard_enum_match_arm)]
        match value.classify() {
            serde_json::error::Category::Io => Self::Io(value.into()),
            _ => Self::Json(value),
        }
    }
}

#[derive(Error, Debug)]
pub(crate) enum Config {
    #[error("could not decode solver config: {0}")]
    Decode(serde_json::Error),
    #[error("given key manager provider is not supported: {0}")]
    UnsupportedProvider(String),
    #[error("key manager provider {provider} requires {field} to be set")]
    MissingField {
        provider: &'static str,
        field: &'static str,
    },
    #[error("{field} is not a valid URL: {source}")]
    InvalidUrl {
        field: &'static str,
        source: url::ParseError,
    },
    #[error("an account name is required to authenticate with TransIP")]
    MissingAccountName,
}

#[derive(Error, Debug)]
pub(crate) enum Credential {
    #[error("neither a private key nor a key manager is available to authenticate with")]
    NoCredentials,
    #[error(r#"secret "{}/{}" does not exist"#, .namespace.escape_default(), .name.escape_default())]
    SecretNotFound { namespace: String, name: String },
    #[error(r#"no private key for "{}" in secret "{}/{}""#, .key.escape_default(), .namespace.escape_default(), .name.escape_default())]
    PrivateKeyNotFound {
        namespace: String,
        name: String,
        key: String,
    },
    #[error("private key could not be parsed: {0}")]
    InvalidPrivateKey(String),
    #[error("failed to obtain an ambient credential: {0}")]
    Ambient(String),
}

#[derive(Error, Debug)]
pub(crate) enum Signing {
    #[error("could not reach the key management service: {0}")]
    Request(reqwest::Error),
    #[error("key management service refused to sign (status {status}): {message}")]
    Remote { status: StatusCode, message: String },
    #[error("key management service returned an unreadable signature: {0}")]
    Response(String),
    #[error("local signing failed: {0}")]
    Local(#[from] rsa::Error),
}

#[derive(Error, Debug)]
pub(crate) enum ProviderApi {
    #[error("{operation} request failed: {source}")]
    Request {
        operation: &'static str,
        source: reqwest::Error,
    },
    #[error("{operation} returned status {status}: {message}")]
    Status {
        operation: &'static str,
        status: StatusCode,
        message: String,
    },
}

#[derive(Error, Debug)]
pub(crate) enum SecretStore {
    #[error("the solver has not been initialized with a cluster connection")]
    Uninitialized,
    #[error("in-cluster configuration is unavailable: {0}")]
    InClusterUnavailable(String),
    #[error("could not reach the cluster API server: {0}")]
    Request(reqwest::Error),
    #[error("cluster API server returned status {status}: {message}")]
    Status { status: StatusCode, message: String },
}

/// Raised when the authoritative zone for a name cannot be determined. This is
/// never returned as a failure; resolution degrades to the cleaned zone name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("could not determine authoritative zone for {zone}: {reason}")]
pub(crate) struct ZoneResolution {
    pub(crate) zone: String,
    pub(crate) reason: String,
}
