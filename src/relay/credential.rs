//! Provider API key handling.

use secrecy::{ExposeSecret, Secret};

/// An API key for the model provider.
///
/// The key is only readable through [`ExposeSecret`]; `Debug` never prints it.
#[derive(Clone)]
pub struct Credential(Secret<String>);

impl Credential {
    /// Wrap a key, rejecting blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(Secret::new(trimmed.to_string())))
        }
    }

    /// Masked form for display, e.g. `gsk_ab...wxyz`.
    pub fn masked(&self) -> String {
        let key = self.0.expose_secret();
        let chars: Vec<char> = key.chars().collect();
        if chars.len() <= 12 {
            return "*".repeat(chars.len());
        }
        let head: String = chars[..6].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

impl ExposeSecret<String> for Credential {
    fn expose_secret(&self) -> &String {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_rejected() {
        assert!(Credential::parse("").is_none());
        assert!(Credential::parse("   \n").is_none());
    }

    #[test]
    fn test_trimmed_and_hidden() {
        let cred = Credential::parse("  gsk_0123456789abcdefWXYZ ").unwrap();
        assert_eq!(cred.expose_secret(), "gsk_0123456789abcdefWXYZ");
        assert_eq!(cred.masked(), "gsk_01...WXYZ");
        assert_eq!(format!("{:?}", cred), "Credential([REDACTED])");
    }

    #[test]
    fn test_short_key_fully_masked() {
        let cred = Credential::parse("short").unwrap();
        assert_eq!(cred.masked(), "*****");
    }
}
