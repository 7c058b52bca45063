// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub(crate) const TXT_RECORD_TYPE: &str = "TXT";

/// A single DNS record as the provider reports it. Two entries are the same
/// record only if every field matches.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub(crate) struct DnsEntry {
    /// The record label, relative to the domain.
    pub(crate) name: String,
    /// The TTL of the record, in seconds.
    pub(crate) expire: u32,
    #[serde(rename = "type")]
    pub(crate) type_: String,
    pub(crate) content: String,
}

impl DnsEntry {
    pub(crate) fn txt(name: String, expire: u32, content: String) -> Self {
        Self {
            name,
            expire,
            type_: TXT_RECORD_TYPE.to_owned(),
            content,
        }
    }
}

impl std::fmt::Display for DnsEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} {:?}",
            self.name, self.expire, self.type_, self.content
        )
    }
}

/// The record operations the reconciler needs from a DNS provider.
#[async_trait]
pub(crate) trait DnsClient: Send + Sync {
    async fn get_dns_entries(&self, domain: &str) -> Result<Vec<DnsEntry>>;

    async fn add_dns_entry(&self, domain: &str, entry: &DnsEntry) -> Result<()>;

    async fn remove_dns_entry(&self, domain: &str, entry: &DnsEntry) -> Result<()>;
}

#[async_trait]
impl<T: DnsClient + ?Sized> DnsClient for Box<T> {
    async fn get_dns_entries(&self, domain: &str) -> Result<Vec<DnsEntry>> {
        (**self).get_dns_entries(domain).await
    }

    async fn add_dns_entry(&self, domain: &str, entry: &DnsEntry) -> Result<()> {
        (**self).add_dns_entry(domain, entry).await
    }

    async fn remove_dns_entry(&self, domain: &str, entry: &DnsEntry) -> Result<()> {
        (**self).remove_dns_entry(domain, entry).await
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::{collections::HashMap, sync::Arc};

    use async_trait::async_trait;
    use tokio::sync::RwLock;

    use reqwest::StatusCode;

    use crate::error::{self, Result};

    use super::{DnsClient, DnsEntry};

    /// Records every zone's entries in memory, counting mutations so tests can
    /// tell a no-op from a write.
    #[derive(Clone, Default)]
    pub(crate) struct Memory {
        zones: Arc<RwLock<HashMap<String, Vec<DnsEntry>>>>,
        mutations: Arc<RwLock<usize>>,
        reject_writes: bool,
    }

    impl Memory {
        /// Refuses every add and remove, as a provider rejecting the request
        /// would.
        pub(crate) fn rejecting_writes(self) -> Self {
            Self {
                reject_writes: true,
                ..self
            }
        }

        fn check_write(&self, operation: &'static str) -> Result<()> {
            if self.reject_writes {
                return Err(error::ProviderApi::Status {
                    operation,
                    status: StatusCode::FORBIDDEN,
                    message: "read-only zone".to_owned(),
                }
                .into());
            }
            Ok(())
        }

        pub(crate) async fn with_entries(domain: &str, entries: Vec<DnsEntry>) -> Self {
            let memory = Self::default();
            let _ = memory
                .zones
                .write()
                .await
                .insert(domain.to_owned(), entries);
            memory
        }

        pub(crate) async fn entries(&self, domain: &str) -> Vec<DnsEntry> {
            self.zones
                .read()
                .await
                .get(domain)
                .cloned()
                .unwrap_or_default()
        }

        pub(crate) async fn mutations(&self) -> usize {
            *self.mutations.read().await
        }
    }

    #[async_trait]
    impl DnsClient for Memory {
        async fn get_dns_entries(&self, domain: &str) -> Result<Vec<DnsEntry>> {
            Ok(self.entries(domain).await)
        }

        async fn add_dns_entry(&self, domain: &str, entry: &DnsEntry) -> Result<()> {
            self.check_write("add DNS entry")?;
            self.zones
                .write()
                .await
                .entry(domain.to_owned())
                .or_default()
                .push(entry.clone());
            *self.mutations.write().await += 1;
            Ok(())
        }

        async fn remove_dns_entry(&self, domain: &str, entry: &DnsEntry) -> Result<()> {
            self.check_write("remove DNS entry")?;
            if let Some(entries) = self.zones.write().await.get_mut(domain) {
                entries.retain(|candidate| candidate != entry);
            }
            *self.mutations.write().await += 1;
            Ok(())
        }
    }
}
