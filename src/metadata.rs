// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use once_cell::sync::Lazy;

pub(crate) static CLIENT_TYPE_ID: Lazy<String> = Lazy::new(|| {
    option_env!("CARGO_PKG_NAME")
        .unwrap_or("cert-manager-webhook-transip")
        .to_owned()
});
pub(crate) static USER_AGENT: Lazy<String> = Lazy::new(|| {
    format!(
        "{}/{}",
        *CLIENT_TYPE_ID,
        option_env!("CARGO_PKG_VERSION").unwrap_or("0.0.0")
    )
});
