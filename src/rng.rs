// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::cell::RefCell;

use rand::{distributions::Alphanumeric, thread_rng, Rng as _, SeedableRng};
use rand_chacha::ChaCha20Rng;

const NONCE_LENGTH: usize = 32;

thread_local! {
    // LINT: We need a working random number generator for the program to
    // function.
    #[allow(clippy::expect_used)]
    static RNG: RefCell<ChaCha20Rng> = RefCell::new(ChaCha20Rng::from_rng(thread_rng()).expect("random number generator failed to initialize"));
}

pub(crate) fn map<F, R>(mut f: F) -> R
where
    F: FnMut(&mut ChaCha20Rng) -> R,
{
    RNG.with(|rng| f(&mut rng.borrow_mut()))
}

/// Generates a single-use alphanumeric nonce suitable for authentication
/// requests.
pub(crate) fn nonce() -> String {
    map(|rng| {
        (0..NONCE_LENGTH)
            .map(|_| char::from(rng.sample(Alphanumeric)))
            .collect()
    })
}
