//! Identity derivation: hash, reference, stamp and short code
//!
//! ## Derivations
//!
//! - `hash`: SHA-512 over the JSON encoding of `factors ++ [difference]`,
//!   hex encoded. Pure in its inputs.
//! - `reference`: `hash` of `factors ++ [uuid v7, uuid v4]`. Never repeats.
//! - `stamp`: `hash` of `factors ++ [attempt]`, cut into 31 hex digit
//!   chunks and encoded through a salted base-62 alphabet, then fitted to
//!   12 characters. The same hash cut into 32 hex digit chunks and encoded
//!   through a base-74 alphabet (62 plus `?!@$%#&*+=<>`) gives the 6
//!   character `short` code.
//!
//! The alphabet is shuffled by the salt, and reshuffled before each chunk
//! by the salt plus the last emitted character. Stamps are one-way: chunk
//! digits are concatenated without separators and the result is cut to
//! length, so nothing decodes a stamp back to its hash. Lookups go through
//! the stored `stamp` field.
//!
//! [`IdentityGenerator`] runs the derivations against a store, rejecting
//! hashes and references already taken by an active record and retrying
//! stamps on collision up to the configured ceiling.

use rand::seq::SliceRandom;
use serde_json::Value;
use sha2::{Digest, Sha512};
use tracing::{debug, warn};
use uuid::Uuid;

use myelin_core::{
    fields, DocumentStore, EntityConfig, Error, Identity, Query, Result, ResultExt,
};

/// Stamp length in characters
pub const STAMP_LENGTH: usize = 12;

/// Short code length in characters
pub const SHORT_LENGTH: usize = 6;

/// Alphabet of the stamp encoding
pub const STAMP_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Alphabet of the short code encoding
pub const SHORT_ALPHABET: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789?!@$%#&*+=<>";

const STAMP_CHUNK: usize = 31;
const SHORT_CHUNK: usize = 32;
const PAD: char = '0';

const SALT_WORDS: [u16; 25] = [
    0x0aaa, 0x0bbb, 0x0bbb, 0x0ccc, 0x0ddd, 0x0eee, 0x0fff, 0x0fad, 0x0bad, 0x0bed, 0x0fed, 0x0abe,
    0xdead, 0xbeef, 0xdeaf, 0xcafe, 0xfeed, 0xfade, 0xbead, 0xdeed, 0xaaaa, 0xbbbb, 0xcccc, 0xdddd,
    0xffff,
];
const SALT_SEPARATOR: &str = "\u{200b}";

// =============================================================================
// Pure derivations
// =============================================================================

/// Content hash of a factor set
///
/// # Errors
///
/// `EmptyInput` if `factors` is empty.
pub fn derive_hash(factors: &[Value], difference: &str) -> Result<String> {
    if factors.is_empty() {
        return Err(Error::EmptyInput("no uniqueness factors".to_string()));
    }
    let mut material = factors.to_vec();
    material.push(Value::String(difference.to_string()));
    let encoded = serde_json::to_vec(&Value::Array(material))?;
    Ok(hex::encode(Sha512::digest(&encoded)))
}

/// Nonce-based reference for a factor set
///
/// # Errors
///
/// `EmptyInput` if `factors` is empty.
pub fn derive_reference(factors: &[Value], difference: &str) -> Result<String> {
    if factors.is_empty() {
        return Err(Error::EmptyInput("no uniqueness factors".to_string()));
    }
    let mut material = factors.to_vec();
    material.push(Value::String(Uuid::now_v7().to_string()));
    material.push(Value::String(Uuid::new_v4().to_string()));
    derive_hash(&material, difference)
}

/// Stamp and short code pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    /// 12 character public code
    pub stamp: String,
    /// 6 character short code
    pub short: String,
}

/// Stamp and short code for one attempt
///
/// # Errors
///
/// `EmptyInput` if `factors` is empty.
pub fn derive_stamp(factors: &[Value], difference: &str, salt: &str, attempt: u32) -> Result<Stamp> {
    if factors.is_empty() {
        return Err(Error::EmptyInput("no uniqueness factors".to_string()));
    }
    let mut material = factors.to_vec();
    material.push(Value::from(attempt));
    let hash = derive_hash(&material, difference)?;

    let stamp = encode(&hash, STAMP_CHUNK, STAMP_ALPHABET, salt)?;
    let short = encode(&hash, SHORT_CHUNK, SHORT_ALPHABET, salt)?;
    Ok(Stamp {
        stamp: fit(stamp, STAMP_LENGTH),
        short: fit(short, SHORT_LENGTH),
    })
}

/// Random salt for the stamp encoding
///
/// The pool words are shuffled and joined with a zero-width space.
pub fn generate_salt() -> String {
    let mut words = SALT_WORDS;
    words.shuffle(&mut rand::thread_rng());
    words
        .iter()
        .map(|word| format!("{:04x}", word))
        .collect::<Vec<_>>()
        .join(SALT_SEPARATOR)
}

/// Salted base-N encoding of a hex digest, one number per chunk
///
/// Chunk boundaries are not marked in the output; there is no decoder.
fn encode(hex_digest: &str, chunk: usize, alphabet: &str, salt: &str) -> Result<String> {
    let mut alphabet = alphabet.as_bytes().to_vec();
    consistent_shuffle(&mut alphabet, salt.as_bytes());

    let mut out: Vec<u8> = Vec::new();
    for piece in hex_digest.as_bytes().chunks(chunk) {
        let piece = std::str::from_utf8(piece)
            .map_err(|e| Error::Unexpected(format!("digest is not ascii: {}", e)))?;
        let number = u128::from_str_radix(piece, 16)
            .map_err(|e| Error::Unexpected(format!("digest is not hex: {}", e)))?;

        let lottery: Vec<u8> = salt.bytes().chain(out.last().copied()).collect();
        consistent_shuffle(&mut alphabet, &lottery);
        push_digits(number, &alphabet, &mut out);
    }

    String::from_utf8(out).map_err(|e| Error::Unexpected(format!("encoding is not ascii: {}", e)))
}

fn push_digits(mut number: u128, alphabet: &[u8], out: &mut Vec<u8>) {
    let base = alphabet.len() as u128;
    let mut digits = Vec::new();
    loop {
        digits.push(alphabet[(number % base) as usize]);
        number /= base;
        if number == 0 {
            break;
        }
    }
    out.extend(digits.into_iter().rev());
}

/// Deterministic in-place shuffle keyed by `salt`
fn consistent_shuffle(alphabet: &mut [u8], salt: &[u8]) {
    if salt.is_empty() {
        return;
    }
    let mut v = 0usize;
    let mut p = 0usize;
    for i in (1..alphabet.len()).rev() {
        v %= salt.len();
        let c = salt[v] as usize;
        p += c;
        let j = (c + v + p) % i;
        alphabet.swap(i, j);
        v += 1;
    }
}

/// Truncate, or pad on the right with `'0'`, to exactly `len` characters
fn fit(mut code: String, len: usize) -> String {
    code.truncate(len);
    while code.len() < len {
        code.push(PAD);
    }
    code
}

// =============================================================================
// Store-checked generation
// =============================================================================

/// Identity derivation checked against a store
///
/// Uniqueness is checked among active records only.
pub struct IdentityGenerator<'a, S: ?Sized> {
    store: &'a S,
    config: &'a EntityConfig,
    salt: &'a str,
}

impl<'a, S: DocumentStore + ?Sized> IdentityGenerator<'a, S> {
    /// Generator over a store with an entity config and resolved salt
    pub fn new(store: &'a S, config: &'a EntityConfig, salt: &'a str) -> Self {
        Self {
            store,
            config,
            salt,
        }
    }

    /// Content hash, rejected if an active record already carries it
    pub fn hash(&self, factors: &[Value]) -> Result<String> {
        let hash = derive_hash(factors, &self.config.difference)
            .remind("cannot create document hash")?;
        self.ensure_unique(fields::HASH, &hash)
            .remind("cannot create document hash")?;
        Ok(hash)
    }

    /// Reference, rejected if an active record already carries it
    pub fn reference(&self, factors: &[Value]) -> Result<String> {
        let reference = derive_reference(factors, &self.config.difference)
            .remind("cannot create document reference")?;
        self.ensure_unique(fields::REFERENCE, &reference)
            .remind("cannot create document reference")?;
        Ok(reference)
    }

    /// Stamp and short code, retried with the next attempt index while
    /// either collides with an active record
    ///
    /// # Errors
    ///
    /// `IdentityExhausted` once `max_stamp_attempts` attempts collided.
    pub fn stamp(&self, factors: &[Value]) -> Result<Stamp> {
        let attempts = self.config.max_stamp_attempts;
        for attempt in 0..attempts {
            let candidate = derive_stamp(factors, &self.config.difference, self.salt, attempt)
                .remind("cannot create document stamp")?;

            let taken = self.taken(fields::STAMP, &candidate.stamp)?
                || self.taken(fields::SHORT, &candidate.short)?;
            if !taken {
                debug!(target: "myelin::identity", attempt, "stamp accepted");
                return Ok(candidate);
            }
            warn!(target: "myelin::identity", attempt, "document stamp duplicate, reshuffling");
        }
        Err(Error::IdentityExhausted { attempts }).remind("cannot create document stamp")
    }

    /// Full identity bundle: hash, then reference, then stamp
    ///
    /// `display_name` prefixes the code; the entity name prefixes the path.
    pub fn generate(&self, factors: &[Value], display_name: &str) -> Result<Identity> {
        self.generate_inner(factors, display_name)
            .remind("failed generating ID")
    }

    fn generate_inner(&self, factors: &[Value], display_name: &str) -> Result<Identity> {
        let hash = self.hash(factors)?;
        let reference = self.reference(factors)?;
        let Stamp { stamp, short } = self.stamp(factors)?;
        let code = format!("{}-{}", display_name, stamp);
        let path = format!("/{}/{}", self.config.name, code);
        Ok(Identity {
            hash,
            reference,
            stamp,
            short,
            code,
            path,
        })
    }

    fn taken(&self, field: &'static str, value: &str) -> Result<bool> {
        let query = Query::new().eq(field, value).scoped();
        let count = self
            .store
            .count(&query)
            .remind("failed checking document")?;
        Ok(count > 0)
    }

    fn ensure_unique(&self, field: &'static str, value: &str) -> Result<()> {
        if self.taken(field, value)? {
            return Err(Error::Duplicate { field });
        }
        Ok(())
    }
}
