// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

mod directory;
mod kubernetes;
#[cfg(test)]
mod memory;

use std::{collections::HashMap, path::PathBuf};

use async_trait::async_trait;
use secrecy::SecretVec;

use crate::error::Result;

pub(crate) use directory::Directory;
pub(crate) use kubernetes::{InCluster, Kubernetes};
#[cfg(test)]
pub(crate) use memory::Memory;

/// The keyed values of a single secret.
pub(crate) type Data = HashMap<String, SecretVec<u8>>;

/// How to reach the secrets of the cluster the solver serves.
pub(crate) enum ClusterConfig {
    /// Talk to the API server using the pod's service account.
    InCluster(InCluster),
    /// Read secrets mounted into a directory, one subdirectory per namespace.
    Directory(PathBuf),
}

#[async_trait]
pub(crate) trait SecretStore: Send + Sync {
    /// Looks up a secret by name in a namespace, returning `None` if it does
    /// not exist.
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Data>>;
}

#[async_trait]
impl<T: SecretStore + ?Sized> SecretStore for Box<T> {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Data>> {
        (**self).get(namespace, name).await
    }
}

pub(crate) fn connect(config: ClusterConfig) -> Result<Box<dyn SecretStore>> {
    Ok(match config {
        ClusterConfig::InCluster(in_cluster) => Box::new(Kubernetes::new(in_cluster)?),
        ClusterConfig::Directory(root) => Box::new(Directory::new(root)),
    })
}
