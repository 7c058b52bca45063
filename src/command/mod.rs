// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use async_trait::async_trait;
use tokio::io::AsyncReadExt as _;

use crate::{challenge::ChallengeRequest, error::Result, solver::Solver};

pub(crate) mod clean_up;
pub(crate) mod present;

#[async_trait]
pub(crate) trait Command {
    async fn execute(self, solver: &dyn Solver) -> Result<()>;
}

/// Reads one challenge request document from `path`, or from standard input
/// when the path is `-`.
async fn read_challenge(path: &Path) -> Result<ChallengeRequest> {
    let document = if path == Path::new("-") {
        let mut buf = Vec::new();
        let _ = tokio::io::stdin().read_to_end(&mut buf).await?;
        buf
    } else {
        tokio::fs::read(path).await?
    };
    Ok(serde_json::from_slice(&document)?)
}
