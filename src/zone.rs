// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    net::{IpAddr, SocketAddr},
    time::Duration,
};

use async_trait::async_trait;
use hickory_resolver::{
    config::{NameServerConfig, ResolverConfig, ResolverOpts},
    name_server::TokioConnectionProvider,
    proto::{rr::RecordType, xfer::Protocol},
    Resolver, TokioResolver,
};
use log::{trace, warn};

use crate::error::ZoneResolution;

/// Removes the trailing root label separator from a name, if present.
pub(crate) fn un_fqdn(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

/// Returns the label of `fqdn` relative to `domain`, or the whole name if it
/// does not fall under the domain.
pub(crate) fn extract_record_name(fqdn: &str, domain: &str) -> String {
    let clean_fqdn = un_fqdn(fqdn);
    match clean_fqdn.find(&format!(".{domain}")) {
        Some(idx) => clean_fqdn[..idx].to_owned(),
        None => clean_fqdn.to_owned(),
    }
}

/// How a domain name was arrived at.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Source {
    PublicSuffix,
    AuthoritativeZone,
    /// Neither method worked and the zone was used as given.
    Unresolved(ZoneResolution),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ResolvedDomain {
    pub(crate) name: String,
    pub(crate) source: Source,
}

impl ResolvedDomain {
    pub(crate) fn degraded(&self) -> Option<&ZoneResolution> {
        match self.source {
            Source::Unresolved(ref e) => Some(e),
            Source::PublicSuffix | Source::AuthoritativeZone => None,
        }
    }
}

impl std::fmt::Display for ResolvedDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[async_trait]
pub(crate) trait AuthoritativeZone: Send + Sync {
    /// Finds the zone that is authoritative for `fqdn`, returned as a fully
    /// qualified name.
    async fn find_zone(&self, fqdn: &str) -> Result<String, ZoneResolution>;
}

/// Determines the domain under which the provider manages records for `zone`.
/// This never fails: if neither the public suffix list nor DNS can tell us,
/// the zone itself is used and the result says so.
pub(crate) async fn extract_domain_name(
    zone: &str,
    authority: &(dyn AuthoritativeZone + '_),
) -> ResolvedDomain {
    let clean_zone = un_fqdn(zone);

    if let Some(base_domain) = psl::domain_str(clean_zone).filter(|d| !d.is_empty()) {
        return ResolvedDomain {
            name: base_domain.to_owned(),
            source: Source::PublicSuffix,
        };
    }

    match authority.find_zone(zone).await {
        Ok(auth_zone) => ResolvedDomain {
            name: un_fqdn(&auth_zone).to_owned(),
            source: Source::AuthoritativeZone,
        },
        Err(e) => {
            warn!("Continuing with {clean_zone} as the domain name: {e}");
            ResolvedDomain {
                name: clean_zone.to_owned(),
                source: Source::Unresolved(e),
            }
        }
    }
}

/// Finds authoritative zones by walking up the name and asking a recursive
/// resolver for SOA records.
pub(crate) struct Recursive {
    resolver: TokioResolver,
}

impl Recursive {
    pub(crate) fn new(nameservers: &[IpAddr]) -> Self {
        let config = if nameservers.is_empty() {
            ResolverConfig::default()
        } else {
            let mut config = ResolverConfig::new();
            for ip in nameservers {
                config.add_name_server(NameServerConfig::new(
                    SocketAddr::new(*ip, 53),
                    Protocol::Udp,
                ));
            }
            config
        };

        let mut opts = ResolverOpts::default();
        opts.timeout = Duration::from_secs(5);
        opts.attempts = 2;

        Self {
            resolver: Resolver::builder_with_config(config, TokioConnectionProvider::default())
                .with_options(opts)
                .build(),
        }
    }
}

#[async_trait]
impl AuthoritativeZone for Recursive {
    async fn find_zone(&self, fqdn: &str) -> Result<String, ZoneResolution> {
        let clean_fqdn = un_fqdn(fqdn);
        let mut last_error = None;

        let mut candidate = clean_fqdn;
        while !candidate.is_empty() {
            match self
                .resolver
                .lookup(format!("{candidate}.").as_str(), RecordType::SOA)
                .await
            {
                Ok(lookup) => {
                    let soa = lookup.record_iter().find(|record| {
                        record.record_type() == RecordType::SOA
                            && un_fqdn(&record.name().to_utf8()).eq_ignore_ascii_case(candidate)
                    });
                    if let Some(record) = soa {
                        return Ok(record.name().to_utf8());
                    }
                }
                Err(e) => {
                    trace!("No SOA record for {candidate}: {e}");
                    last_error = Some(e.to_string());
                }
            }

            candidate = match candidate.split_once('.') {
                Some((_, parent)) => parent,
                None => break,
            };
        }

        Err(ZoneResolution {
            zone: clean_fqdn.to_owned(),
            reason: last_error.unwrap_or_else(|| "no SOA record found".to_owned()),
        })
    }
}
