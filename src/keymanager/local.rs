// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use rsa::{
    pkcs1::DecodeRsaPrivateKey as _, pkcs8::DecodePrivateKey as _, Pkcs1v15Sign, RsaPrivateKey,
};
use secrecy::{ExposeSecret as _, SecretVec};
use sha2::{Digest as _, Sha512};

use crate::error::{self, Result};

use super::Signer;

/// Signs with an RSA private key held in memory for the duration of a single
/// request.
pub(crate) struct LocalKey {
    key: RsaPrivateKey,
}

impl LocalKey {
    /// Accepts a PEM-encoded key in either PKCS #8 or PKCS #1 form.
    pub(crate) fn from_pem(pem: &SecretVec<u8>) -> Result<Self> {
        let pem = std::str::from_utf8(pem.expose_secret())
            .map_err(|e| error::Credential::InvalidPrivateKey(e.to_string()))?;
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| error::Credential::InvalidPrivateKey(e.to_string()))?;
        Ok(Self { key })
    }
}

#[async_trait]
impl Signer for LocalKey {
    fn kind(&self) -> &'static str {
        "PrivateKey"
    }

    async fn sign(&self, body: &[u8]) -> Result<String> {
        let digest = Sha512::digest(body);
        let signature = self
            .key
            .sign(Pkcs1v15Sign::new::<Sha512>(), &digest)
            .map_err(error::Signing::from)?;
        Ok(base64::encode(signature))
    }
}
