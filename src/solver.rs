// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use async_trait::async_trait;
use log::{debug, error, info};
use secrecy::SecretVec;
use url::Url;

use crate::{
    challenge::{self, ChallengeRequest, SecretKeySelector, SolverConfig},
    dns::{DnsClient, DnsEntry},
    error::{self, Error, Result},
    keymanager::{self, LocalKey, Signer},
    secret::{self, ClusterConfig, SecretStore},
    transip,
    zone::{self, AuthoritativeZone},
};

pub(crate) const NAME: &str = "transip";

/// The interface cert-manager drives a DNS-01 solver through.
#[async_trait]
pub(crate) trait Solver: Send + Sync {
    fn name(&self) -> &'static str;

    /// Connects the solver to the cluster whose secrets it reads credentials
    /// from. Called once, before any challenge is handled.
    async fn initialize(&mut self, config: ClusterConfig) -> Result<()>;

    /// Makes sure the TXT record for the challenge exists.
    async fn present(&self, challenge: &ChallengeRequest) -> Result<()>;

    /// Makes sure the TXT record for the challenge no longer exists. Any other
    /// record under the same name is left alone.
    async fn clean_up(&self, challenge: &ChallengeRequest) -> Result<()>;
}

/// Ensures `entry` exists in `domain`, adding it only if no identical entry is
/// already there.
pub(crate) async fn present(client: &dyn DnsClient, domain: &str, entry: &DnsEntry) -> Result<()> {
    let entries = client.get_dns_entries(domain).await?;
    if entries.iter().any(|candidate| candidate == entry) {
        debug!("Record {entry} already exists in {domain}");
        return Ok(());
    }

    client.add_dns_entry(domain, entry).await?;
    info!("Added record {entry} to {domain}");
    Ok(())
}

/// Ensures `entry` is absent from `domain`. An entry that is already gone is
/// not an error.
pub(crate) async fn clean_up(client: &dyn DnsClient, domain: &str, entry: &DnsEntry) -> Result<()> {
    let entries = client.get_dns_entries(domain).await?;
    match entries.iter().find(|candidate| *candidate == entry) {
        Some(existing) => {
            client.remove_dns_entry(domain, existing).await?;
            info!("Removed record {entry} from {domain}");
        }
        None => info!("Record {entry} not found in {domain}, nothing to clean up"),
    }
    Ok(())
}

#[derive(Clone, Copy, Debug)]
enum Action {
    Present,
    CleanUp,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Present => "present",
            Self::CleanUp => "clean up",
        })
    }
}

/// Solves challenges by managing TXT records through the TransIP API.
pub(crate) struct Transip {
    group_name: String,
    api_url: Url,
    authority: Box<dyn AuthoritativeZone>,
    secrets: Option<Box<dyn SecretStore>>,
}

impl Transip {
    pub(crate) fn new(group_name: String, api_url: Url, authority: Box<dyn AuthoritativeZone>) -> Self {
        Self {
            group_name,
            api_url,
            authority,
            secrets: None,
        }
    }

    pub(crate) fn group_name(&self) -> &str {
        &self.group_name
    }

    async fn private_key(
        &self,
        namespace: &str,
        selector: &SecretKeySelector,
    ) -> Result<SecretVec<u8>> {
        let store = self
            .secrets
            .as_ref()
            .ok_or(error::SecretStore::Uninitialized)?;
        let mut data = store.get(namespace, &selector.name).await?.ok_or_else(|| {
            error::Credential::SecretNotFound {
                namespace: namespace.to_owned(),
                name: selector.name.clone(),
            }
        })?;
        data.remove(&selector.key).ok_or_else(|| {
            error::Credential::PrivateKeyNotFound {
                namespace: namespace.to_owned(),
                name: selector.name.clone(),
                key: selector.key.clone(),
            }
            .into()
        })
    }

    /// Picks the signer used to authenticate with TransIP. A configured key
    /// manager wins over a private key, and its presence excuses a secret or
    /// key that does not exist. Any other failure to read the secret is
    /// returned.
    async fn signer(&self, namespace: &str, config: &SolverConfig) -> Result<Box<dyn Signer>> {
        let key_manager = if config.key_manager.is_configured() {
            Some(keymanager::provider(&config.key_manager)?)
        } else {
            None
        };

        let private_key = if config.private_key_secret_ref.name.is_empty() {
            None
        } else {
            match self
                .private_key(namespace, &config.private_key_secret_ref)
                .await
            {
                Ok(pem) => Some(pem),
                Err(
                    e @ Error::Credential(
                        error::Credential::SecretNotFound { .. }
                        | error::Credential::PrivateKeyNotFound { .. },
                    ),
                ) if key_manager.is_some() => {
                    debug!("Ignoring unavailable private key, the key manager will sign: {e}");
                    None
                }
                Err(e) => return Err(e),
            }
        };

        match (key_manager, private_key) {
            (Some(signer), _) => Ok(signer),
            (None, Some(pem)) => Ok(Box::new(LocalKey::from_pem(&pem)?)),
            (None, None) => Err(error::Credential::NoCredentials.into()),
        }
    }

    async fn client(&self, namespace: &str, config: &SolverConfig) -> Result<transip::Client> {
        let signer = self.signer(namespace, config).await?;
        transip::Client::new(transip::Configuration {
            api_url: self.api_url.clone(),
            account_name: config.account_name.clone(),
            signer,
        })
    }

    async fn handle(&self, challenge: &ChallengeRequest, action: Action) -> Result<()> {
        let domain = zone::extract_domain_name(&challenge.resolved_zone, self.authority.as_ref()).await;
        let record_name = zone::extract_record_name(&challenge.resolved_fqdn, &domain.name);

        let config = challenge::load_config(challenge.config.as_ref()).map_err(|e| {
            error!("Could not {action} record {record_name} in {domain}: {e}");
            e
        })?;
        let entry = DnsEntry::txt(record_name, config.ttl, challenge.key.clone());
        info!(
            "Handling {action} of challenge {} for {} as record {} in {domain}",
            challenge.uid, challenge.dns_name, entry.name
        );
        let best_effort = if domain.degraded().is_some() {
            " (best-effort domain)"
        } else {
            ""
        };

        let client = self
            .client(&challenge.resource_namespace, &config)
            .await
            .map_err(|e| {
                error!(
                    "Could not {action} record {} in {domain}{best_effort}: no TransIP client: {e}",
                    entry.name
                );
                e
            })?;

        let result = match action {
            Action::Present => present(&client, &domain.name, &entry).await,
            Action::CleanUp => clean_up(&client, &domain.name, &entry).await,
        };
        result.map_err(|e| {
            error!(
                "Could not {action} record {} in {domain}{best_effort} (signing with {}): {e}",
                entry.name,
                client.signer_kind()
            );
            e
        })
    }
}

#[async_trait]
impl Solver for Transip {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn initialize(&mut self, config: ClusterConfig) -> Result<()> {
        self.secrets = Some(secret::connect(config)?);
        Ok(())
    }

    async fn present(&self, challenge: &ChallengeRequest) -> Result<()> {
        self.handle(challenge, Action::Present).await
    }

    async fn clean_up(&self, challenge: &ChallengeRequest) -> Result<()> {
        self.handle(challenge, Action::CleanUp).await
    }
}
