// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{env, fs, path::PathBuf};

use log::debug;
use secrecy::{ExposeSecret as _, SecretString};
use serde::Deserialize;

use crate::error::{self, Result};

const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const DEFAULT_IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";
const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

pub(super) const VAULT_RESOURCE: &str = "https://vault.azure.net";

#[derive(Deserialize)]
struct TokenResponse {
    access_token: SecretString,
}

/// Where an access token for Key Vault will come from.
#[derive(Debug, PartialEq)]
pub(super) enum Source<'ambient> {
    ClientSecret {
        tenant_id: &'ambient str,
        client_id: &'ambient str,
    },
    WorkloadIdentity {
        tenant_id: &'ambient str,
        client_id: &'ambient str,
        token_file: &'ambient PathBuf,
    },
    ManagedIdentity {
        client_id: Option<&'ambient str>,
    },
}

/// The credential material the process environment offers, following the
/// variables the Azure SDKs read.
#[derive(Clone, Debug)]
pub(crate) struct Ambient {
    pub(in crate::keymanager) authority_host: String,
    pub(in crate::keymanager) imds_endpoint: String,
    pub(in crate::keymanager) tenant_id: Option<String>,
    pub(in crate::keymanager) client_id: Option<String>,
    pub(in crate::keymanager) client_secret: Option<SecretString>,
    pub(in crate::keymanager) federated_token_file: Option<PathBuf>,
}

impl Default for Ambient {
    fn default() -> Self {
        Self {
            authority_host: DEFAULT_AUTHORITY_HOST.to_owned(),
            imds_endpoint: DEFAULT_IMDS_ENDPOINT.to_owned(),
            tenant_id: None,
            client_id: None,
            client_secret: None,
            federated_token_file: None,
        }
    }
}

impl Ambient {
    pub(crate) fn from_env() -> Self {
        fn var(name: &str) -> Option<String> {
            env::var(name).ok().filter(|value| !value.is_empty())
        }

        let defaults = Self::default();
        Self {
            authority_host: var("AZURE_AUTHORITY_HOST").unwrap_or(defaults.authority_host),
            imds_endpoint: defaults.imds_endpoint,
            tenant_id: var("AZURE_TENANT_ID"),
            client_id: var("AZURE_CLIENT_ID"),
            client_secret: var("AZURE_CLIENT_SECRET").map(SecretString::new),
            federated_token_file: var("AZURE_FEDERATED_TOKEN_FILE").map(PathBuf::from),
        }
    }

    pub(super) fn source(&self) -> Source<'_> {
        match (
            self.tenant_id.as_deref(),
            self.client_id.as_deref(),
            self.client_secret.as_ref(),
            self.federated_token_file.as_ref(),
        ) {
            (Some(tenant_id), Some(client_id), Some(_), _) => Source::ClientSecret {
                tenant_id,
                client_id,
            },
            (Some(tenant_id), Some(client_id), None, Some(token_file)) => {
                Source::WorkloadIdentity {
                    tenant_id,
                    client_id,
                    token_file,
                }
            }
            (_, client_id, _, _) => Source::ManagedIdentity { client_id },
        }
    }

    /// Obtains a bearer token for Key Vault from whichever source the
    /// environment selects.
    pub(super) async fn token(&self, http: &reqwest::Client) -> Result<SecretString> {
        let scope = format!("{VAULT_RESOURCE}/.default");
        let request = match self.source() {
            Source::ClientSecret {
                tenant_id,
                client_id,
            } => {
                debug!("Requesting a Key Vault token with the client secret from the environment");
                let client_secret = self
                    .client_secret
                    .as_ref()
                    .map(|secret| secret.expose_secret().as_str())
                    .unwrap_or_default();
                http.post(self.token_url(tenant_id)).form(&[
                    ("grant_type", "client_credentials"),
                    ("client_id", client_id),
                    ("client_secret", client_secret),
                    ("scope", scope.as_str()),
                ])
            }
            Source::WorkloadIdentity {
                tenant_id,
                client_id,
                token_file,
            } => {
                debug!(
                    "Requesting a Key Vault token with the federated token in {}",
                    token_file.display()
                );
                let assertion = SecretString::new(
                    fs::read_to_string(token_file)
                        .map_err(|e| {
                            error::Credential::Ambient(format!(
                                "could not read federated token file {}: {}",
                                token_file.display(),
                                e
                            ))
                        })?
                        .trim()
                        .to_owned(),
                );
                http.post(self.token_url(tenant_id)).form(&[
                    ("grant_type", "client_credentials"),
                    ("client_id", client_id),
                    ("client_assertion_type", CLIENT_ASSERTION_TYPE),
                    ("client_assertion", assertion.expose_secret().as_str()),
                    ("scope", scope.as_str()),
                ])
            }
            Source::ManagedIdentity { client_id } => {
                debug!("Requesting a Key Vault token from the instance metadata service");
                let mut query = vec![
                    ("api-version", IMDS_API_VERSION),
                    ("resource", VAULT_RESOURCE),
                ];
                if let Some(client_id) = client_id {
                    query.push(("client_id", client_id));
                }
                http.get(&self.imds_endpoint)
                    .header("Metadata", "true")
                    .query(&query)
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| error::Credential::Ambient(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error::Credential::Ambient(format!(
                "token endpoint returned status {status}: {body}"
            ))
            .into());
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| error::Credential::Ambient(format!("unreadable token response: {e}")))?;
        Ok(token.access_token)
    }

    fn token_url(&self, tenant_id: &str) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            tenant_id
        )
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        matchers::{body_string_contains, header, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::error::Error;

    fn with_client_secret(authority_host: String) -> Ambient {
        Ambient {
            authority_host,
            tenant_id: Some("tenant".to_owned()),
            client_id: Some("client".to_owned()),
            client_secret: Some(SecretString::new("hunter2".to_owned())),
            ..Ambient::default()
        }
    }

    #[test]
    fn prefers_client_secret() {
        let ambient = Ambient {
            federated_token_file: Some(PathBuf::from("/var/run/secrets/azure/token")),
            ..with_client_secret(DEFAULT_AUTHORITY_HOST.to_owned())
        };

        assert_eq!(
            ambient.source(),
            Source::ClientSecret {
                tenant_id: "tenant",
                client_id: "client"
            }
        );
    }

    #[test]
    fn uses_workload_identity_without_secret() {
        let token_file = PathBuf::from("/var/run/secrets/azure/token");
        let ambient = Ambient {
            client_secret: None,
            federated_token_file: Some(token_file.clone()),
            ..with_client_secret(DEFAULT_AUTHORITY_HOST.to_owned())
        };

        assert_eq!(
            ambient.source(),
            Source::WorkloadIdentity {
                tenant_id: "tenant",
                client_id: "client",
                token_file: &token_file,
            }
        );
    }

    #[test]
    fn falls_back_to_managed_identity() {
        assert_eq!(
            Ambient::default().source(),
            Source::ManagedIdentity { client_id: None }
        );
    }

    #[tokio::test]
    async fn exchanges_client_secret() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_secret=hunter2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token_type": "Bearer",
                "expires_in": 3599,
                "access_token": "vault-token"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = with_client_secret(server.uri())
            .token(&reqwest::Client::new())
            .await?;

        assert_eq!(token.expose_secret(), "vault-token");
        Ok(())
    }

    #[tokio::test]
    async fn asks_instance_metadata_service() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/metadata/identity/oauth2/token"))
            .and(header("Metadata", "true"))
            .and(query_param("resource", VAULT_RESOURCE))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "imds-token",
                "expires_in": "3599",
                "resource": VAULT_RESOURCE,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ambient = Ambient {
            imds_endpoint: format!("{}/metadata/identity/oauth2/token", server.uri()),
            ..Ambient::default()
        };
        let token = ambient.token(&reqwest::Client::new()).await?;

        assert_eq!(token.expose_secret(), "imds-token");
        Ok(())
    }

    #[tokio::test]
    async fn rejected_credentials_are_credential_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
            .mount(&server)
            .await;

        let result = with_client_secret(server.uri())
            .token(&reqwest::Client::new())
            .await;

        assert!(matches!(
            result,
            Err(Error::Credential(error::Credential::Ambient(_)))
        ));
    }
}
