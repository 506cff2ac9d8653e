//! Proptest generators for property-based testing.

use proptest::prelude::*;

use sealdoc_core::{Identity, Keypair};
use sealdoc_perms::{SECRET_MAX, SECRET_MIN};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random non-null identity.
pub fn identity() -> impl Strategy<Value = Identity> {
    keypair().prop_map(|kp| kp.identity())
}

/// Generate a valid (non-empty) document name.
pub fn document_name() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9 ._-]{0,63}".prop_map(String::from)
}

/// Generate a 10-digit secret.
pub fn secret() -> impl Strategy<Value = u64> {
    SECRET_MIN..=SECRET_MAX
}

/// Generate a plaintext body: any UTF-8, including the empty string.
pub fn body(max_chars: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(any::<char>(), 0..=max_chars).prop_map(|chars| chars.into_iter().collect())
}

/// Parameters for a document's lifetime: creation plus a run of writes.
#[derive(Debug, Clone)]
pub struct DocumentParams {
    pub owner: Keypair,
    pub name: String,
    pub secret: u64,
    pub bodies: Vec<String>,
}

impl Arbitrary for DocumentParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            any::<[u8; 32]>(), // owner seed
            document_name(),
            secret(),
            prop::collection::vec(body(64), 0..8),
        )
            .prop_map(|(seed, name, secret, bodies)| DocumentParams {
                owner: Keypair::from_seed(&seed),
                name,
                secret,
                bodies,
            })
            .boxed()
    }
}
