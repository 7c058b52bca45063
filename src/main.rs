// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(elided_lifetimes_in_paths)]
#![warn(
    rust_2018_idioms,
    future_incompatible,
    unused,
    unused_lifetimes,
    unused_qualifications,
    unused_results,
    anonymous_parameters,
    deprecated_in_future,
    elided_lifetimes_in_paths,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    missing_doc_code_examples,
    private_doc_tests,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::unseparated_literal_suffix,
    clippy::decimal_literal_representation,
    clippy::single_char_lifetime_names,
    clippy::fallible_impl_from,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::wildcard_enum_match_arm,
    clippy::deref_by_slicing,
    clippy::default_numeric_fallback,
    clippy::shadow_reuse,
    clippy::clone_on_ref_ptr,
    clippy::todo,
    clippy::string_add,
    clippy::use_debug,
    clippy::future_not_send
)]
#![cfg_attr(not(test), warn(clippy::panic_in_result_fn))]

mod challenge;
mod command;
mod dns;
mod error;
mod keymanager;
mod metadata;
mod rng;
mod secret;
mod solver;
mod transip;
mod zone;

use std::{net::IpAddr, path::PathBuf, process};

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use error::Result;
use log::{error, info, warn};
use solver::Solver as _;
use url::Url;

#[derive(Debug, Subcommand)]
enum Command {
    Present(command::present::Command),
    CleanUp(command::clean_up::Command),
}

#[async_trait]
impl command::Command for Command {
    async fn execute(self, solver: &dyn solver::Solver) -> Result<()> {
        match self {
            Self::Present(cmd) => cmd.execute(solver).await,
            Self::CleanUp(cmd) => cmd.execute(solver).await,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// The API group the solver is registered under with cert-manager.
    #[arg(long, env = "GROUP_NAME")]
    group_name: String,

    /// The base URL of the TransIP REST API.
    #[arg(long, env = "TRANSIP_API_URL", default_value = transip::DEFAULT_API_URL, value_parser = Url::parse)]
    transip_api_url: Url,

    /// Read secrets from a directory laid out as
    /// `<namespace>/<secret>/<key>` instead of asking the Kubernetes API
    /// server.
    #[arg(long, env = "SECRETS_DIR", value_hint = clap::ValueHint::DirPath)]
    secrets_dir: Option<PathBuf>,

    /// A recursive resolver to use when looking up authoritative zones. May be
    /// given more than once. Defaults to the system configuration.
    #[arg(long = "nameserver", value_name = "IP")]
    nameservers: Vec<IpAddr>,

    #[clap(subcommand)]
    command: Command,
}

async fn run(args: Args) -> Result<()> {
    let mut solver = solver::Transip::new(
        args.group_name,
        args.transip_api_url,
        Box::new(zone::Recursive::new(&args.nameservers)),
    );

    let cluster = match args.secrets_dir {
        Some(dir) => Some(secret::ClusterConfig::Directory(dir)),
        None => match secret::InCluster::from_env() {
            Ok(in_cluster) => Some(secret::ClusterConfig::InCluster(in_cluster)),
            Err(e) => {
                warn!("Private keys cannot be read from cluster secrets: {}", e);
                None
            }
        },
    };
    if let Some(cluster) = cluster {
        solver.initialize(cluster).await?;
    }
    info!(
        "Solver {} ready for group {}",
        solver.name(),
        solver.group_name()
    );

    command::Command::execute(args.command, &solver).await
}

#[tokio::main]
async fn main() {
    let logger_env = env_logger::Env::new()
        .filter_or("WEBHOOK_LOG", "info")
        .write_style("WEBHOOK_LOG_STYLE");
    env_logger::Builder::from_env(logger_env).init();

    if let Err(e) = run(Args::parse()).await {
        error!("We encountered an error: {}", e);
        process::exit(1);
    };
}
