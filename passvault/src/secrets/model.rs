//! Typed secrets and the metadata key they are stored under.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of secret kinds. The numeric tags are persisted next to every
/// ciphertext and must never be reassigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum SecretType {
    Password = 1,
    Card = 2,
    Text = 3,
}

impl SecretType {
    pub const ALL: [SecretType; 3] = [SecretType::Password, SecretType::Card, SecretType::Text];

    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(SecretType::Password),
            2 => Some(SecretType::Card),
            3 => Some(SecretType::Text),
            _ => None,
        }
    }

    /// Human-readable label shown to clients.
    pub fn label(self) -> &'static str {
        match self {
            SecretType::Password => "Login/Password pair",
            SecretType::Card => "Bank Card",
            SecretType::Text => "Text",
        }
    }
}

impl From<SecretType> for u8 {
    fn from(value: SecretType) -> Self {
        value.tag()
    }
}

impl TryFrom<u8> for SecretType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        SecretType::from_tag(value).ok_or_else(|| format!("unknown secret type tag {value}"))
    }
}

impl fmt::Display for SecretType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Natural key of a stored secret; unique on `(user_id, kind, name)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SecretMetadata {
    pub name: String,
    pub kind: SecretType,
    pub user_id: i64,
}

impl SecretMetadata {
    pub fn new(user_id: i64, kind: SecretType, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            user_id,
        }
    }
}

// Used in error text and logs; never includes secret contents.
impl fmt::Display for SecretMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "user_id={} type={} name={:?}",
            self.user_id,
            self.kind.tag(),
            self.name
        )
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PasswordSecret {
    pub login: String,
    pub password: String,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CardSecret {
    pub number: String,
    pub holder_name: String,
    pub date: String,
    pub ccv: String,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextSecret {
    pub text: String,
}

// Debug output is redacted so secrets never reach logs through `{:?}`.
impl fmt::Debug for PasswordSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordSecret")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for CardSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardSecret").finish_non_exhaustive()
    }
}

impl fmt::Debug for TextSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextSecret").finish_non_exhaustive()
    }
}

/// A fully populated secret of one of the supported kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Secret {
    Password(PasswordSecret),
    Card(CardSecret),
    Text(TextSecret),
}

impl Secret {
    pub fn kind(&self) -> SecretType {
        match self {
            Secret::Password(_) => SecretType::Password,
            Secret::Card(_) => SecretType::Card,
            Secret::Text(_) => SecretType::Text,
        }
    }
}

impl From<PasswordSecret> for Secret {
    fn from(value: PasswordSecret) -> Self {
        Secret::Password(value)
    }
}

impl From<CardSecret> for Secret {
    fn from(value: CardSecret) -> Self {
        Secret::Card(value)
    }
}

impl From<TextSecret> for Secret {
    fn from(value: TextSecret) -> Self {
        Secret::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{CardSecret, PasswordSecret, Secret, SecretMetadata, SecretType};

    #[test]
    fn tags_are_stable() {
        assert_eq!(SecretType::Password.tag(), 1);
        assert_eq!(SecretType::Card.tag(), 2);
        assert_eq!(SecretType::Text.tag(), 3);
        for kind in SecretType::ALL {
            assert_eq!(SecretType::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(SecretType::from_tag(0), None);
        assert_eq!(SecretType::from_tag(4), None);
    }

    #[test]
    fn labels_match_client_wording() {
        assert_eq!(SecretType::Password.to_string(), "Login/Password pair");
        assert_eq!(SecretType::Card.to_string(), "Bank Card");
        assert_eq!(SecretType::Text.to_string(), "Text");
    }

    #[test]
    fn debug_output_hides_secret_fields() {
        let secret = Secret::from(PasswordSecret {
            login: "alice".into(),
            password: "hunter2".into(),
        });
        let printed = format!("{secret:?}");
        assert!(printed.contains("alice"));
        assert!(!printed.contains("hunter2"));

        let card = CardSecret {
            number: "4111111111111111".into(),
            holder_name: "A B".into(),
            date: "12/30".into(),
            ccv: "123".into(),
        };
        assert!(!format!("{card:?}").contains("4111"));
    }

    #[test]
    fn metadata_display_names_the_key() {
        let metadata = SecretMetadata::new(7, SecretType::Password, "email");
        assert_eq!(metadata.to_string(), "user_id=7 type=1 name=\"email\"");
    }
}
