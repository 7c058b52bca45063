// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use log::debug;
use secrecy::SecretVec;

use crate::error::Result;

use super::{Data, SecretStore};

/// Reads secrets laid out as `<root>/<namespace>/<name>/<key>`, which is how
/// Kubernetes projects secret volumes.
pub(crate) struct Directory {
    root: PathBuf,
}

impl Directory {
    pub(crate) fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_owned(),
        }
    }
}

fn is_plain_component(component: &str) -> bool {
    !component.is_empty()
        && !component.starts_with('.')
        && !component.contains(std::path::is_separator)
}

#[async_trait]
impl SecretStore for Directory {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Data>> {
        if !is_plain_component(namespace) || !is_plain_component(name) {
            debug!("Refusing to look up secret {namespace}/{name} outside of {}", self.root.display());
            return Ok(None);
        }

        let dir = self.root.join(namespace).join(name);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut data = Data::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let Some(key) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            // Projected volumes keep their bookkeeping in hidden entries.
            if !is_plain_component(&key) || !path.is_file() {
                continue;
            }
            let _ = data.insert(key, SecretVec::new(fs::read(&path)?));
        }
        Ok(Some(data))
    }
}
