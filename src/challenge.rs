// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use serde::Deserialize;

use crate::{
    error::{self, Result},
    keymanager,
};

/// A DNS-01 challenge as delivered by cert-manager.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct ChallengeRequest {
    pub(crate) uid: String,
    pub(crate) dns_name: String,
    /// The value the TXT record must hold.
    pub(crate) key: String,
    pub(crate) resource_namespace: String,
    #[serde(rename = "resolvedFQDN")]
    pub(crate) resolved_fqdn: String,
    pub(crate) resolved_zone: String,
    /// Solver configuration from the issuer, left undecoded until a request is
    /// actually handled.
    pub(crate) config: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub(crate) struct SecretKeySelector {
    pub(crate) name: String,
    pub(crate) key: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct SolverConfig {
    pub(crate) account_name: String,
    pub(crate) private_key_secret_ref: SecretKeySelector,
    pub(crate) ttl: u32,
    pub(crate) key_manager: keymanager::Config,
}

/// Decodes the solver configuration attached to a challenge. A challenge with
/// no configuration at all yields the zero-valued config.
pub(crate) fn load_config(config: Option<&serde_json::Value>) -> Result<SolverConfig> {
    match config {
        None | Some(serde_json::Value::Null) => Ok(SolverConfig::default()),
        Some(value) => {
            Ok(SolverConfig::deserialize(value).map_err(error::Config::Decode)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::Error;

    #[test]
    fn missing_config_is_zero_valued() -> Result<()> {
        assert_eq!(load_config(None)?, SolverConfig::default());
        assert_eq!(
            load_config(Some(&serde_json::Value::Null))?,
            SolverConfig::default()
        );
        Ok(())
    }

    #[test]
    fn decodes_full_config() -> Result<()> {
        let config = load_config(Some(&json!({
            "accountName": "example",
            "privateKeySecretRef": {"name": "transip-credentials", "key": "privateKey"},
            "ttl": 300,
            "keyManager": {
                "providerName": "AzureKeyVault",
                "vaultUrl": "https://example.vault.azure.net",
                "keyName": "transip"
            }
        })))?;

        assert_eq!(config.account_name, "example");
        assert_eq!(config.private_key_secret_ref.name, "transip-credentials");
        assert_eq!(config.private_key_secret_ref.key, "privateKey");
        assert_eq!(config.ttl, 300);
        assert_eq!(config.key_manager.provider_name, "AzureKeyVault");
        assert_eq!(config.key_manager.vault_url, "https://example.vault.azure.net");
        assert_eq!(config.key_manager.key_name, "transip");
        Ok(())
    }

    #[test]
    fn unset_fields_default() -> Result<()> {
        let config = load_config(Some(&json!({"accountName": "example"})))?;

        assert_eq!(config.ttl, 0);
        assert_eq!(config.private_key_secret_ref, SecretKeySelector::default());
        assert!(!config.key_manager.is_configured());
        Ok(())
    }

    #[test]
    fn rejects_negative_ttl() {
        let result = load_config(Some(&json!({"ttl": -1})));

        assert!(matches!(
            result,
            Err(Error::Config(error::Config::Decode(_)))
        ));
    }

    #[test]
    fn decodes_challenge_request() -> Result<()> {
        let request: ChallengeRequest = serde_json::from_value(json!({
            "uid": "4c7e1d4b",
            "action": "Present",
            "type": "dns-01",
            "dnsName": "foo.example.com",
            "key": "token",
            "resourceNamespace": "cert-manager",
            "resolvedFQDN": "_acme-challenge.foo.example.com.",
            "resolvedZone": "example.com.",
            "allowAmbientCredentials": false,
            "config": {"accountName": "example"}
        }))?;

        assert_eq!(request.resolved_fqdn, "_acme-challenge.foo.example.com.");
        assert_eq!(request.resolved_zone, "example.com.");
        assert_eq!(request.resource_namespace, "cert-manager");
        assert_eq!(request.uid, "4c7e1d4b");
        assert_eq!(load_config(request.config.as_ref())?.account_name, "example");
        Ok(())
    }
}
