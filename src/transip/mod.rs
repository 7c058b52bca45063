// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

mod api;

use async_trait::async_trait;
use log::debug;
use reqwest::header;
use secrecy::{ExposeSecret as _, SecretString};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use url::Url;

use crate::{
    dns::{DnsClient, DnsEntry},
    error::{self, Result},
    keymanager::Signer,
    metadata, rng,
};

pub(crate) const DEFAULT_API_URL: &str = "https://api.transip.nl/v6";
const TOKEN_EXPIRATION: &str = "30 minutes";

pub(crate) struct Configuration {
    pub(crate) api_url: Url,
    pub(crate) account_name: String,
    pub(crate) signer: Box<dyn Signer>,
}

/// A TransIP API client. It authenticates on first use and keeps its token for
/// as long as the client lives.
pub(crate) struct Client {
    http: reqwest::Client,
    api_url: Url,
    account_name: String,
    signer: Box<dyn Signer>,
    token: RwLock<Option<SecretString>>,
}

impl Client {
    pub(crate) fn new(config: Configuration) -> Result<Self> {
        if config.account_name.is_empty() {
            return Err(error::Config::MissingAccountName.into());
        }

        let http = reqwest::Client::builder()
            .user_agent(metadata::USER_AGENT.as_str())
            .build()
            .map_err(|source| error::ProviderApi::Request {
                operation: "client setup",
                source,
            })?;

        Ok(Self {
            http,
            api_url: config.api_url,
            account_name: config.account_name,
            signer: config.signer,
            token: RwLock::new(None),
        })
    }

    /// The kind of signer this client authenticates with.
    pub(crate) fn signer_kind(&self) -> &'static str {
        self.signer.kind()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url.as_str().trim_end_matches('/'), path)
    }

    async fn token(&self) -> Result<SecretString> {
        if let Some(token) = self.token.read().await.as_ref() {
            return Ok(token.clone());
        }

        let nonce = rng::nonce();
        let label = format!("{}-{}", *metadata::CLIENT_TYPE_ID, nonce);
        let body = serde_json::to_vec(&api::AuthRequest {
            login: &self.account_name,
            nonce: &nonce,
            read_only: false,
            expiration_time: TOKEN_EXPIRATION,
            label: &label,
            global_key: true,
        })?;

        debug!(
            "Authenticating with TransIP as {} using a {} signature",
            self.account_name,
            self.signer.kind()
        );
        let signature = self.signer.sign(&body).await?;
        let response = self
            .http
            .post(self.url("/auth"))
            .header("Signature", signature)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|source| error::ProviderApi::Request {
                operation: "authenticate",
                source,
            })?;
        let auth: api::AuthResponse = Self::parse("authenticate", response).await?;

        *self.token.write().await = Some(auth.token.clone());
        Ok(auth.token)
    }

    async fn check(operation: &'static str, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<api::ErrorResponse>(&text) {
            Ok(api::ErrorResponse { error }) => error,
            Err(_) => text,
        };
        Err(error::ProviderApi::Status {
            operation,
            status,
            message,
        }
        .into())
    }

    async fn parse<T: DeserializeOwned>(
        operation: &'static str,
        response: reqwest::Response,
    ) -> Result<T> {
        Self::check(operation, response)
            .await?
            .json()
            .await
            .map_err(|source| error::ProviderApi::Request { operation, source }.into())
    }

    async fn send(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        let token = self.token().await?;
        let response = request
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|source| error::ProviderApi::Request { operation, source })?;
        Self::check(operation, response).await
    }
}

#[async_trait]
impl DnsClient for Client {
    async fn get_dns_entries(&self, domain: &str) -> Result<Vec<DnsEntry>> {
        let operation = "list DNS entries";
        let response = self
            .send(operation, self.http.get(self.url(&format!("/domains/{domain}/dns"))))
            .await?;
        let entries: api::DnsEntries = Self::parse(operation, response).await?;
        Ok(entries.dns_entries)
    }

    async fn add_dns_entry(&self, domain: &str, entry: &DnsEntry) -> Result<()> {
        let _ = self
            .send(
                "add DNS entry",
                self.http
                    .post(self.url(&format!("/domains/{domain}/dns")))
                    .json(&api::DnsEntryBody { dns_entry: entry }),
            )
            .await?;
        Ok(())
    }

    async fn remove_dns_entry(&self, domain: &str, entry: &DnsEntry) -> Result<()> {
        let _ = self
            .send(
                "remove DNS entry",
                self.http
                    .delete(self.url(&format!("/domains/{domain}/dns")))
                    .json(&api::DnsEntryBody { dns_entry: entry }),
            )
            .await?;
        Ok(())
    }
}
