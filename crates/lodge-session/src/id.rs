//! Session identifier generation.
//!
//! Identifiers are drawn from the operating system's CSPRNG. If that source
//! errors or returns short, the generator falls back to the thread-local
//! CSPRNG rather than failing the caller. Only when both sources fail does
//! generation surface [`Error::RandomnessUnavailable`].

use std::fmt;
use std::sync::Arc;

use rand::TryRngCore;
use rand::rngs::OsRng;
use tracing::warn;

use crate::config::{DEFAULT_ID_BYTES, MAX_ID_BYTES, MIN_ID_BYTES};
use crate::error::{Error, Result};

/// Opaque, unguessable session identifier.
///
/// Always lowercase hex, so it is safe to carry as a cookie value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    /// Validate a carried token.
    ///
    /// Returns `None` for anything that could not have been produced by an
    /// [`IdGenerator`]: wrong length, odd length, or non-hex characters.
    pub fn parse(token: &str) -> Option<Self> {
        let well_formed = (MIN_ID_BYTES * 2..=MAX_ID_BYTES * 2).contains(&token.len())
            && token.len() % 2 == 0
            && token
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        well_formed.then(|| Self(token.to_string()))
    }

    /// Borrow the identifier as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the identifier, returning the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A source of random bytes.
///
/// Implementations must fill the whole buffer or return an error; a short
/// read is reported by returning the number of bytes actually written.
pub trait EntropySource: Send + Sync {
    /// Name used in log output.
    fn name(&self) -> &'static str;

    /// Fill `dest`, returning how many bytes were written.
    fn fill(&self, dest: &mut [u8]) -> std::result::Result<usize, String>;
}

/// Operating system randomness (`getrandom`).
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn name(&self) -> &'static str {
        "os"
    }

    fn fill(&self, dest: &mut [u8]) -> std::result::Result<usize, String> {
        OsRng
            .try_fill_bytes(dest)
            .map(|()| dest.len())
            .map_err(|e| e.to_string())
    }
}

/// Thread-local ChaCha CSPRNG, periodically reseeded from the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadEntropy;

impl EntropySource for ThreadEntropy {
    fn name(&self) -> &'static str {
        "thread"
    }

    fn fill(&self, dest: &mut [u8]) -> std::result::Result<usize, String> {
        rand::rng()
            .try_fill_bytes(dest)
            .map(|()| dest.len())
            .map_err(|e| match e {})
    }
}

/// Generates session identifiers.
///
/// Cheap to clone; sources are shared.
#[derive(Clone)]
pub struct IdGenerator {
    primary: Arc<dyn EntropySource>,
    fallback: Arc<dyn EntropySource>,
    bytes: usize,
}

impl fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdGenerator")
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback.name())
            .field("bytes", &self.bytes)
            .finish()
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_ID_BYTES)
    }
}

impl IdGenerator {
    /// Create a generator producing `bytes` random bytes per identifier.
    ///
    /// Values outside the accepted strength range are clamped to it.
    pub fn new(bytes: usize) -> Self {
        Self::with_sources(bytes, Arc::new(OsEntropy), Arc::new(ThreadEntropy))
    }

    /// Create a generator with explicit primary and fallback sources.
    pub fn with_sources(
        bytes: usize,
        primary: Arc<dyn EntropySource>,
        fallback: Arc<dyn EntropySource>,
    ) -> Self {
        Self {
            primary,
            fallback,
            bytes: bytes.clamp(MIN_ID_BYTES, MAX_ID_BYTES),
        }
    }

    /// Length in characters of every identifier this generator produces.
    pub fn encoded_len(&self) -> usize {
        self.bytes * 2
    }

    /// Generate a fresh identifier.
    pub fn generate(&self) -> Result<SessionId> {
        let mut buf = vec![0u8; self.bytes];

        match read_exact(self.primary.as_ref(), &mut buf) {
            Ok(()) => return Ok(SessionId(hex::encode(&buf))),
            Err(reason) => {
                warn!(
                    source = self.primary.name(),
                    fallback = self.fallback.name(),
                    %reason,
                    "Primary entropy source failed, falling back"
                );
            }
        }

        buf.fill(0);
        read_exact(self.fallback.as_ref(), &mut buf)
            .map(|()| SessionId(hex::encode(&buf)))
            .map_err(|reason| {
                Error::RandomnessUnavailable(format!(
                    "{} and {} sources failed: {reason}",
                    self.primary.name(),
                    self.fallback.name()
                ))
            })
    }
}

fn read_exact(source: &dyn EntropySource, buf: &mut [u8]) -> std::result::Result<(), String> {
    let n = source.fill(buf)?;
    if n < buf.len() {
        return Err(format!("short read: {n} of {} bytes", buf.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct Failing;

    impl EntropySource for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn fill(&self, _dest: &mut [u8]) -> std::result::Result<usize, String> {
            Err("device unavailable".to_string())
        }
    }

    struct Short;

    impl EntropySource for Short {
        fn name(&self) -> &'static str {
            "short"
        }

        fn fill(&self, dest: &mut [u8]) -> std::result::Result<usize, String> {
            let half = dest.len() / 2;
            dest[..half].fill(0xAB);
            Ok(half)
        }
    }

    #[test]
    fn test_ids_are_unique_and_fixed_length() {
        let generator = IdGenerator::default();
        let mut seen = HashSet::new();

        for _ in 0..10_000 {
            let id = generator.generate().unwrap();
            assert_eq!(id.as_str().len(), 32);
            assert!(id.as_str().bytes().all(|b| b.is_ascii_hexdigit()));
            assert!(seen.insert(id), "duplicate identifier generated");
        }
    }

    #[test]
    fn test_strength_is_clamped() {
        let generator = IdGenerator::new(4);
        assert_eq!(generator.encoded_len(), 32);

        let generator = IdGenerator::new(32);
        assert_eq!(generator.generate().unwrap().as_str().len(), 64);

        let generator = IdGenerator::new(1024);
        assert_eq!(generator.encoded_len(), MAX_ID_BYTES * 2);
    }

    #[test]
    fn test_falls_back_when_primary_fails() {
        let generator =
            IdGenerator::with_sources(16, Arc::new(Failing), Arc::new(ThreadEntropy));
        let a = generator.generate().unwrap();
        let b = generator.generate().unwrap();
        assert_eq!(a.as_str().len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_short_read_triggers_fallback() {
        let generator = IdGenerator::with_sources(16, Arc::new(Short), Arc::new(ThreadEntropy));
        let id = generator.generate().unwrap();
        assert!(!id.as_str().starts_with("abababababababab"));
    }

    #[test]
    fn test_both_sources_failing_is_fatal() {
        let generator = IdGenerator::with_sources(16, Arc::new(Failing), Arc::new(Short));
        let err = generator.generate().unwrap_err();
        assert!(matches!(err, Error::RandomnessUnavailable(_)));
    }

    #[test]
    fn test_parse_accepts_generated_ids() {
        let id = IdGenerator::default().generate().unwrap();
        assert_eq!(SessionId::parse(id.as_str()), Some(id));
    }

    #[test]
    fn test_parse_rejects_malformed_tokens() {
        assert_eq!(SessionId::parse(""), None);
        assert_eq!(SessionId::parse("abc"), None);
        assert_eq!(SessionId::parse(&"g".repeat(32)), None);
        assert_eq!(SessionId::parse(&"A".repeat(32)), None);
        assert_eq!(SessionId::parse(&"a".repeat(33)), None);
        assert_eq!(SessionId::parse("0123456789abcdef0123456789abcde;"), None);
    }

    #[test]
    fn test_parse_rejects_oversized_tokens() {
        let longest = IdGenerator::new(MAX_ID_BYTES).generate().unwrap();
        assert!(SessionId::parse(longest.as_str()).is_some());

        assert_eq!(SessionId::parse(&"ab".repeat(MAX_ID_BYTES + 1)), None);
        assert_eq!(SessionId::parse(&"a".repeat(1 << 20)), None);
    }
}
