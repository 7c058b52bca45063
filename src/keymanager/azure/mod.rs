// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

mod credential;

use async_trait::async_trait;
use log::debug;
use secrecy::ExposeSecret as _;
use serde::{Deserialize, Serialize};
use serde_with::{
    base64::{Base64, UrlSafe},
    formats::Unpadded,
    serde_as,
};
use sha2::{Digest as _, Sha512};
use url::Url;

use crate::{
    error::{self, Result},
    metadata,
};

use super::{Config, ProviderKind, Signer};

pub(crate) use credential::Ambient;

const API_VERSION: &str = "7.4";
const SIGNING_ALGORITHM: &str = "RS512";
// An empty version selects the latest version of the key.
const LATEST_KEY_VERSION: &str = "";

#[serde_as]
#[derive(Serialize)]
struct SignRequest {
    alg: &'static str,
    #[serde_as(as = "Base64<UrlSafe, Unpadded>")]
    value: Vec<u8>,
}

#[serde_as]
#[derive(Deserialize)]
struct SignResponse {
    #[serde_as(as = "Base64<UrlSafe, Unpadded>")]
    value: Vec<u8>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Delegates signing to a key held in Azure Key Vault. The key material never
/// leaves the vault.
pub(crate) struct KeyVault {
    vault_url: Url,
    key_name: String,
    ambient: Ambient,
    http: reqwest::Client,
}

impl KeyVault {
    pub(crate) fn new(config: &Config, ambient: Ambient) -> Result<Self> {
        let provider = ProviderKind::AzureKeyVault.name();
        if config.vault_url.is_empty() {
            return Err(error::Config::MissingField {
                provider,
                field: "vaultUrl",
            }
            .into());
        }
        if config.key_name.is_empty() {
            return Err(error::Config::MissingField {
                provider,
                field: "keyName",
            }
            .into());
        }

        let vault_url = Url::parse(&config.vault_url).map_err(|source| {
            error::Config::InvalidUrl {
                field: "vaultUrl",
                source,
            }
        })?;
        let http = reqwest::Client::builder()
            .user_agent(metadata::USER_AGENT.as_str())
            .build()
            .map_err(error::Signing::Request)?;

        Ok(Self {
            vault_url,
            key_name: config.key_name.clone(),
            ambient,
            http,
        })
    }

    fn sign_url(&self) -> String {
        format!(
            "{}/keys/{}/{}/sign",
            self.vault_url.as_str().trim_end_matches('/'),
            self.key_name,
            LATEST_KEY_VERSION
        )
    }
}

#[async_trait]
impl Signer for KeyVault {
    fn kind(&self) -> &'static str {
        ProviderKind::AzureKeyVault.name()
    }

    async fn sign(&self, body: &[u8]) -> Result<String> {
        let token = self.ambient.token(&self.http).await?;

        debug!(
            "Asking {} to sign with key {}",
            self.vault_url, self.key_name
        );
        let response = self
            .http
            .post(self.sign_url())
            .query(&[("api-version", API_VERSION)])
            .bearer_auth(token.expose_secret())
            .json(&SignRequest {
                alg: SIGNING_ALGORITHM,
                value: Sha512::digest(body).to_vec(),
            })
            .send()
            .await
            .map_err(error::Signing::Request)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorResponse>(&text) {
                Ok(ErrorResponse { error }) => format!("{}: {}", error.code, error.message),
                Err(_) => text,
            };
            return Err(error::Signing::Remote { status, message }.into());
        }

        let signature: SignResponse = response
            .json()
            .await
            .map_err(|e| error::Signing::Response(e.to_string()))?;
        Ok(base64::encode(signature.value))
    }
}
