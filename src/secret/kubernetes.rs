// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{collections::HashMap, env, fs, path::Path};

use async_trait::async_trait;
use log::debug;
use reqwest::StatusCode;
use secrecy::{ExposeSecret as _, SecretString, SecretVec};
use serde::Deserialize;
use serde_with::{base64::Base64, serde_as};
use url::Url;

use crate::{
    error::{self, Result},
    metadata,
};

use super::{Data, SecretStore};

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

#[serde_as]
#[derive(Deserialize)]
struct Secret {
    #[serde_as(as = "HashMap<_, Base64>")]
    #[serde(default)]
    data: HashMap<String, Vec<u8>>,
}

/// Connection details for the API server of the cluster we run in.
pub(crate) struct InCluster {
    pub(crate) api_url: Url,
    pub(crate) token: SecretString,
    pub(crate) ca_certificate: Option<Vec<u8>>,
}

impl InCluster {
    /// Loads the service account credentials Kubernetes injects into every
    /// pod.
    pub(crate) fn from_env() -> Result<Self> {
        fn unavailable(message: String) -> error::SecretStore {
            error::SecretStore::InClusterUnavailable(message)
        }

        let host = env::var("KUBERNETES_SERVICE_HOST")
            .map_err(|_| unavailable("KUBERNETES_SERVICE_HOST is not set".to_owned()))?;
        let port = env::var("KUBERNETES_SERVICE_PORT")
            .map_err(|_| unavailable("KUBERNETES_SERVICE_PORT is not set".to_owned()))?;
        let host = if host.contains(':') {
            format!("[{host}]")
        } else {
            host
        };
        let api_url = Url::parse(&format!("https://{host}:{port}"))
            .map_err(|e| unavailable(format!("invalid API server address: {e}")))?;

        let dir = Path::new(SERVICE_ACCOUNT_DIR);
        let token = fs::read_to_string(dir.join("token"))
            .map_err(|e| unavailable(format!("could not read service account token: {e}")))?;
        let ca_certificate = fs::read(dir.join("ca.crt"))
            .map_err(|e| unavailable(format!("could not read cluster CA bundle: {e}")))?;

        Ok(Self {
            api_url,
            token: SecretString::new(token.trim().to_owned()),
            ca_certificate: Some(ca_certificate),
        })
    }
}

pub(crate) struct Kubernetes {
    api_url: Url,
    token: SecretString,
    http: reqwest::Client,
}

impl Kubernetes {
    pub(crate) fn new(config: InCluster) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(metadata::USER_AGENT.as_str());
        if let Some(pem) = config.ca_certificate.as_deref() {
            builder = builder.add_root_certificate(
                reqwest::Certificate::from_pem(pem).map_err(error::SecretStore::Request)?,
            );
        }

        Ok(Self {
            api_url: config.api_url,
            token: config.token,
            http: builder.build().map_err(error::SecretStore::Request)?,
        })
    }
}

#[async_trait]
impl SecretStore for Kubernetes {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Data>> {
        let url = format!(
            "{}/api/v1/namespaces/{}/secrets/{}",
            self.api_url.as_str().trim_end_matches('/'),
            namespace,
            name
        );
        debug!("Fetching secret {namespace}/{name}");

        let response = self
            .http
            .get(url)
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(error::SecretStore::Request)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let secret: Secret = response.json().await.map_err(error::SecretStore::Request)?;
                Ok(Some(
                    secret
                        .data
                        .into_iter()
                        .map(|(key, value)| (key, SecretVec::new(value)))
                        .collect(),
                ))
            }
            status => Err(error::SecretStore::Status {
                status,
                message: response.text().await.unwrap_or_default(),
            }
            .into()),
        }
    }
}
