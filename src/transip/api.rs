// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::dns::DnsEntry;

#[derive(Debug, Serialize)]
pub(super) struct AuthRequest<'req> {
    pub(super) login: &'req str,
    pub(super) nonce: &'req str,
    pub(super) read_only: bool,
    pub(super) expiration_time: &'req str,
    pub(super) label: &'req str,
    pub(super) global_key: bool,
}

#[derive(Deserialize)]
pub(super) struct AuthResponse {
    pub(super) token: SecretString,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DnsEntries {
    #[serde(default)]
    pub(super) dns_entries: Vec<DnsEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DnsEntryBody<'entry> {
    pub(super) dns_entry: &'entry DnsEntry,
}

#[derive(Deserialize)]
pub(super) struct ErrorResponse {
    pub(super) error: String,
}

#[cfg(test)]
mod tests {
    use serde_test::{assert_ser_tokens, Token};

    use super::*;

    #[test]
    fn auth_request_uses_snake_case() {
        assert_ser_tokens(
            &AuthRequest {
                login: "example",
                nonce: "n",
                read_only: false,
                expiration_time: "30 minutes",
                label: "l",
                global_key: true,
            },
            &[
                Token::Struct {
                    name: "AuthRequest",
                    len: 6,
                },
                Token::Str("login"),
                Token::Str("example"),
                Token::Str("nonce"),
                Token::Str("n"),
                Token::Str("read_only"),
                Token::Bool(false),
                Token::Str("expiration_time"),
                Token::Str("30 minutes"),
                Token::Str("label"),
                Token::Str("l"),
                Token::Str("global_key"),
                Token::Bool(true),
                Token::StructEnd,
            ],
        );
    }
}
