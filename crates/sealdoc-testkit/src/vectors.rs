//! Golden test vectors for deterministic verification.
//!
//! Identifier and key derivation are computed independently by every client,
//! so they must agree across implementations. Changing either function makes
//! every stored identifier or body unreachable.

use serde::Serialize;

use sealdoc_core::compute_identifier;
use sealdoc_perms::derive_key;

/// Expected `compute_identifier` output for a filename.
#[derive(Debug, Clone, Serialize)]
pub struct IdentifierVector {
    pub name: &'static str,
    pub input: &'static str,
    /// Expected identifier (hex).
    pub expected: &'static str,
}

/// Expected `derive_key` output for a secret.
#[derive(Debug, Clone, Serialize)]
pub struct KeyVector {
    pub name: &'static str,
    pub secret: u64,
    /// Expected key (hex).
    pub expected: &'static str,
}

/// All identifier vectors.
pub fn identifier_vectors() -> Vec<IdentifierVector> {
    vec![
        IdentifierVector {
            name: "empty input",
            input: "",
            expected: "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262",
        },
        IdentifierVector {
            name: "plain filename",
            input: "report.pdf",
            expected: "80d28b09433e9e4b7b8cca1c082a154fc2dbadaa81eced26db119dac53f8328e",
        },
        IdentifierVector {
            name: "multi-byte filename",
            input: "Übersicht 2024 📄.md",
            expected: "8805738c607de93592d9e6866351c1aca3f125e9f78e3fbb17e6457851297bdf",
        },
    ]
}

/// All key derivation vectors.
pub fn key_vectors() -> Vec<KeyVector> {
    vec![
        KeyVector {
            name: "smallest 10-digit secret",
            secret: 1_000_000_000,
            expected: "743d0c80197c988031e0623cdc06f2e468de0d7569e59402aac1e41abff791bd",
        },
        KeyVector {
            name: "largest 10-digit secret",
            secret: 9_999_999_999,
            expected: "6a0f43cbdc627f355118fa6235fce4a8660ea4ca9fa49137f9e17306ea569be8",
        },
        KeyVector {
            name: "zero",
            secret: 0,
            expected: "5a6160ec8c974846a28280afa6f56e8a419b6905481f19c8074517ded31671aa",
        },
    ]
}

/// Check every vector against this implementation.
///
/// Returns `(name, matches, actual_hex)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    let identifiers = identifier_vectors().into_iter().map(|v| {
        let actual = compute_identifier(v.input).to_hex();
        (v.name.to_string(), actual == v.expected, actual)
    });
    let keys = key_vectors().into_iter().map(|v| {
        let actual = hex::encode(derive_key(v.secret).as_bytes());
        (v.name.to_string(), actual == v.expected, actual)
    });

    identifiers.chain(keys).collect()
}

/// All vectors with their computed outputs, for export to other clients.
pub fn vectors_json() -> serde_json::Value {
    serde_json::json!({
        "identifiers": identifier_vectors()
            .iter()
            .map(|v| serde_json::json!({
                "vector": v,
                "actual": compute_identifier(v.input).to_hex(),
            }))
            .collect::<Vec<_>>(),
        "keys": key_vectors()
            .iter()
            .map(|v| serde_json::json!({
                "vector": v,
                "actual": hex::encode(derive_key(v.secret).as_bytes()),
            }))
            .collect::<Vec<_>>(),
    })
}
