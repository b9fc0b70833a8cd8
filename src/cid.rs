//! Content identifier codec.
//!
//! Every stored file is named by a content hash that circulates in two
//! historical encodings: a legacy fixed-length base58 multihash form
//! (`Qm…`) and a modern self-describing multibase form (`bafy…`). The two
//! are interconvertible; the modern form is canonical and is the only one
//! persisted. The legacy form is recomputed on demand for lookup and
//! display.
//!
//! Pure functions, no I/O.

use data_encoding::BASE32_NOPAD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Multihash tag for a sha2-256 digest.
const MULTIHASH_SHA2_256: u8 = 0x12;
/// Length byte of a sha2-256 multihash.
const DIGEST_LEN: u8 = 0x20;
/// Version byte of the modern self-describing form.
const VERSION_MODERN: u8 = 0x01;
/// Content codec carried by the modern form (dag-pb).
const CODEC_DAG_PB: u8 = 0x70;
/// Multibase prefix for lowercase base32.
const MULTIBASE_BASE32: char = 'b';
/// Character length of the legacy base58 form.
const LEGACY_LEN: usize = 46;

/// A content identifier string that could not be decoded under either
/// known scheme.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid content identifier {input:?}: {reason}")]
pub struct InvalidCid {
    pub input: String,
    pub reason: String,
}

impl InvalidCid {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        InvalidCid {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Canonical pair of encodings for one content identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CidPair {
    /// Legacy base58 multihash form (`Qm…`). Derived, never persisted.
    pub legacy: String,
    /// Modern multibase form (`b…`). The canonical, persisted form.
    pub modern: String,
}

/// Decode `input` in either encoding and produce both forms.
///
/// The legacy form is the base58 encoding of a sha2-256 multihash; the
/// modern form wraps the same multihash in a version/codec header and a
/// lowercase base32 multibase. Any other version tag, codec, digest
/// length, or decode failure is an [`InvalidCid`].
pub fn parse(input: &str) -> Result<CidPair, InvalidCid> {
    if input.len() == LEGACY_LEN && input.starts_with("Qm") {
        let multihash = bs58::decode(input)
            .into_vec()
            .map_err(|e| InvalidCid::new(input, format!("base58 decode failed: {}", e)))?;
        check_multihash(input, &multihash)?;
        Ok(CidPair {
            legacy: input.to_string(),
            modern: encode_modern(&multihash),
        })
    } else if let Some(body) = input.strip_prefix(MULTIBASE_BASE32) {
        let bytes = BASE32_NOPAD
            .decode(body.to_ascii_uppercase().as_bytes())
            .map_err(|e| InvalidCid::new(input, format!("base32 decode failed: {}", e)))?;
        if bytes.len() < 2 {
            return Err(InvalidCid::new(input, "truncated"));
        }
        if bytes[0] != VERSION_MODERN {
            return Err(InvalidCid::new(
                input,
                format!("unsupported version tag {:#04x}", bytes[0]),
            ));
        }
        if bytes[1] != CODEC_DAG_PB {
            return Err(InvalidCid::new(
                input,
                format!("unsupported content codec {:#04x}", bytes[1]),
            ));
        }
        let multihash = &bytes[2..];
        check_multihash(input, multihash)?;
        Ok(CidPair {
            legacy: bs58::encode(multihash).into_string(),
            modern: input.to_string(),
        })
    } else {
        Err(InvalidCid::new(input, "unrecognized encoding"))
    }
}

/// Like [`parse`], but a decode failure is a logic error.
///
/// For call sites that already validated the string's shape, e.g. when
/// re-deriving the legacy form of a persisted canonical key.
pub fn parse_required(input: &str) -> CidPair {
    match parse(input) {
        Ok(pair) => pair,
        Err(e) => panic!("content identifier assumed valid: {}", e),
    }
}

fn check_multihash(input: &str, multihash: &[u8]) -> Result<(), InvalidCid> {
    if multihash.len() != 2 + DIGEST_LEN as usize {
        return Err(InvalidCid::new(
            input,
            format!("multihash length {} (expected 34)", multihash.len()),
        ));
    }
    if multihash[0] != MULTIHASH_SHA2_256 {
        return Err(InvalidCid::new(
            input,
            format!("unsupported multihash tag {:#04x}", multihash[0]),
        ));
    }
    if multihash[1] != DIGEST_LEN {
        return Err(InvalidCid::new(
            input,
            format!("unsupported digest length {:#04x}", multihash[1]),
        ));
    }
    Ok(())
}

fn encode_modern(multihash: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(2 + multihash.len());
    bytes.push(VERSION_MODERN);
    bytes.push(CODEC_DAG_PB);
    bytes.extend_from_slice(multihash);
    let mut out = String::with_capacity(1 + BASE32_NOPAD.encode_len(bytes.len()));
    out.push(MULTIBASE_BASE32);
    out.push_str(&BASE32_NOPAD.encode(&bytes).to_ascii_lowercase());
    out
}
