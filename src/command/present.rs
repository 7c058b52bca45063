// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use async_trait::async_trait;
use clap::Parser;

use crate::{error::Result, solver::Solver};

/// Create the TXT record a challenge asks for.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// A file holding the challenge request as JSON, or `-` to read it from
    /// standard input.
    #[clap(default_value = "-", value_hint = clap::ValueHint::FilePath)]
    challenge: PathBuf,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, solver: &dyn Solver) -> Result<()> {
        let challenge = super::read_challenge(&self.challenge).await?;
        solver.present(&challenge).await
    }
}
