// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

mod azure;
mod local;

use std::str::FromStr;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{self, Result};

pub(crate) use local::LocalKey;

/// Declares which external key management service should sign on our behalf.
/// An empty provider name means none is configured.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct Config {
    pub(crate) provider_name: String,
    pub(crate) vault_url: String,
    pub(crate) key_name: String,
}

impl Config {
    pub(crate) fn is_configured(&self) -> bool {
        !self.provider_name.is_empty()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum ProviderKind {
    AzureKeyVault,
}

impl ProviderKind {
    pub(crate) const fn name(self) -> &'static str {
        match self {
            Self::AzureKeyVault => "AzureKeyVault",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = error::Config;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AzureKeyVault" => Ok(Self::AzureKeyVault),
            _ => Err(error::Config::UnsupportedProvider(s.to_owned())),
        }
    }
}

#[async_trait]
pub(crate) trait Signer: Send + Sync {
    /// A short name for the backend, used to give log messages context.
    fn kind(&self) -> &'static str;

    /// Signs the SHA-512 digest of `body` and returns the signature encoded as
    /// standard base64.
    async fn sign(&self, body: &[u8]) -> Result<String>;
}

#[async_trait]
impl<T: Signer + ?Sized> Signer for Box<T> {
    fn kind(&self) -> &'static str {
        (**self).kind()
    }

    async fn sign(&self, body: &[u8]) -> Result<String> {
        (**self).sign(body).await
    }
}

/// Constructs the signer described by `config`. Required settings are checked
/// here so that a misconfiguration surfaces before any credential is requested
/// or network call is made.
pub(crate) fn provider(config: &Config) -> Result<Box<dyn Signer>> {
    match config.provider_name.parse::<ProviderKind>()? {
        ProviderKind::AzureKeyVault => Ok(Box::new(azure::KeyVault::new(
            config,
            azure::Ambient::from_env(),
        )?)),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn azure_config() -> Config {
        Config {
            provider_name: "AzureKeyVault".to_owned(),
            vault_url: "https://example.vault.azure.net".to_owned(),
            key_name: "transip".to_owned(),
        }
    }

    #[test]
    fn selects_azure_key_vault() -> Result<()> {
        let signer = provider(&azure_config())?;

        assert_eq!(signer.kind(), ProviderKind::AzureKeyVault.name());
        Ok(())
    }

    #[test]
    fn rejects_unknown_provider() {
        let config = Config {
            provider_name: "HashiCorpVault".to_owned(),
            ..azure_config()
        };

        match provider(&config) {
            Err(Error::Config(error::Config::UnsupportedProvider(name))) => {
                assert_eq!(name, "HashiCorpVault");
            }
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("unknown provider was accepted"),
        }
    }

    #[test]
    fn requires_vault_url() {
        let config = Config {
            vault_url: String::new(),
            ..azure_config()
        };

        assert!(matches!(
            provider(&config),
            Err(Error::Config(error::Config::MissingField {
                field: "vaultUrl",
                ..
            }))
        ));
    }

    #[test]
    fn requires_key_name() {
        let config = Config {
            key_name: String::new(),
            ..azure_config()
        };

        assert!(matches!(
            provider(&config),
            Err(Error::Config(error::Config::MissingField {
                field: "keyName",
                ..
            }))
        ));
    }

    #[test]
    fn rejects_malformed_vault_url() {
        let config = Config {
            vault_url: "not a url".to_owned(),
            ..azure_config()
        };

        assert!(matches!(
            provider(&config),
            Err(Error::Config(error::Config::InvalidUrl { .. }))
        ));
    }
}
