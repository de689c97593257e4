use serde::{Serialize, Deserialize, Serializer};
use std::fmt;

/// Wraps personal data (emails, names) so it never shows up in `Debug` or
/// `Display` output, which is what every `tracing` field ends up using.
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

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
        // API responses and storage need the real value; only log output is masked.
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &T {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_output_is_masked() {
        let email = Masked::new("zema@example.com".to_string());
        assert_eq!(format!("{:?}", email), "********");
        assert_eq!(email.to_string(), "********");
        assert_eq!(email.expose(), "zema@example.com");
    }

    #[test]
    fn test_serialization_keeps_value() {
        let email = Masked::new("zema@example.com".to_string());
        let json = serde_json::to_string(&email).unwrap();
        assert_eq!(json, "\"zema@example.com\"");
    }
}
