// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use secrecy::{ExposeSecret as _, SecretVec};
use tokio::sync::RwLock;

use crate::error::Result;

use super::{Data, SecretStore};

#[derive(Clone, Default)]
pub(crate) struct Memory {
    secrets: Arc<RwLock<HashMap<(String, String), HashMap<String, Vec<u8>>>>>,
}

impl Memory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn insert(&self, namespace: &str, name: &str, key: &str, value: &[u8]) {
        let _ = self
            .secrets
            .write()
            .await
            .entry((namespace.to_owned(), name.to_owned()))
            .or_default()
            .insert(key.to_owned(), value.to_vec());
    }
}

#[async_trait]
impl SecretStore for Memory {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Data>> {
        let guard = self.secrets.read().await;
        Ok(guard
            .get(&(namespace.to_owned(), name.to_owned()))
            .map(|data| {
                data.iter()
                    .map(|(key, value)| (key.clone(), SecretVec::new(value.clone())))
                    .collect()
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scopes_secrets_to_namespace() -> Result<()> {
        let store = Memory::new();
        store.insert("cert-manager", "transip", "privateKey", b"pem").await;

        let data = store.get("cert-manager", "transip").await?;
        assert_eq!(
            data.as_ref()
                .and_then(|data| data.get("privateKey"))
                .map(|value| value.expose_secret().clone()),
            Some(b"pem".to_vec())
        );
        assert!(store.get("default", "transip").await?.is_none());
        Ok(())
    }
}
