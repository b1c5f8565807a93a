use sha2::{Digest, Sha512};
use std::fmt::{Display, Formatter};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Entity tag of a response body: uppercase hex SHA-512.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprints a buffered response body.
    ///
    /// The body is read as UTF-8 text (leading byte order mark dropped,
    /// invalid sequences replaced) and hashed in its re-encoded form, so two
    /// bodies that render to the same text share a fingerprint.
    #[must_use]
    pub fn of(body: &[u8]) -> Self {
        let body = body.strip_prefix(UTF8_BOM).unwrap_or(body);
        let text = String::from_utf8_lossy(body);
        let digest = Sha512::digest(text.as_bytes());
        Fingerprint(hex::encode_upper(digest))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `ETag` response header.
    #[must_use]
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
