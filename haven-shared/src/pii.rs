use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps a secret (session-access tokens, contact details) so that `Debug` and
/// `Display` never print it. Serialization still emits the real value because
/// API responses must hand the secret to its owner.
#[derive(Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(T);

impl<T> Masked<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Borrow the secret. Call sites are easy to grep for.
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for Masked<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_and_display_are_redacted() {
        let token = Masked::new("hv_secret".to_string());
        assert_eq!(format!("{:?}", token), "********");
        assert_eq!(token.to_string(), "********");
        assert_eq!(token.expose(), "hv_secret");
    }

    #[test]
    fn test_serialization_is_transparent() {
        let token = Masked::new("hv_secret".to_string());
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, "\"hv_secret\"");

        let back: Masked<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, token);
    }
}
