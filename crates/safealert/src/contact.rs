//! Trusted contact model.
//!
//! A contact is a display name plus optional phone and email. Phone and email
//! are free text; nothing checks that they are routable.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// A person who receives emergency shares.
///
/// Serialized as `{name, phone, email}` with absent fields written as empty
/// strings, which is the layout the contact list has always been stored in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Display name. Never blank for contacts created through [`Contact::new`].
    pub name: String,

    /// Phone number, used as the SMS recipient.
    #[serde(
        default,
        serialize_with = "blank_if_none",
        deserialize_with = "none_if_blank"
    )]
    pub phone: Option<String>,

    /// Email address, used as the mail recipient.
    #[serde(
        default,
        serialize_with = "blank_if_none",
        deserialize_with = "none_if_blank"
    )]
    pub email: Option<String>,
}

impl Contact {
    /// Create a contact, trimming every field.
    ///
    /// Blank phone or email values are treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `name` is empty after trimming.
    pub fn new(name: &str, phone: Option<&str>, email: Option<&str>) -> Result<Self> {
        Ok(Self {
            name: non_blank(name, "name")?,
            phone: trim_optional(phone),
            email: trim_optional(email),
        })
    }

    /// Check the contact still satisfies the name invariant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the name is blank.
    pub fn validate(&self) -> Result<()> {
        non_blank(&self.name, "name").map(|_| ())
    }

    /// Whether the contact can be addressed directly by SMS or email.
    #[must_use]
    pub fn has_direct_route(&self) -> bool {
        self.phone.is_some() || self.email.is_some()
    }
}

impl std::fmt::Display for Contact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        let details: Vec<&str> = [self.phone.as_deref(), self.email.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if !details.is_empty() {
            write!(f, " ({})", details.join(", "))?;
        }
        Ok(())
    }
}

/// Validates that a string is not blank, returning it trimmed.
fn non_blank(value: &str, field: &'static str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::validation(field, "must not be empty"))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Trims an optional string, returning None if blank.
fn trim_optional(value: Option<&str>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn blank_if_none<S: Serializer>(
    value: &Option<String>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(value.as_deref().unwrap_or(""))
}

fn none_if_blank<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(trim_optional(value.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_fields() {
        let contact = Contact::new("  Jo ", Some(" 555-1212 "), Some("")).unwrap();
        assert_eq!(contact.name, "Jo");
        assert_eq!(contact.phone.as_deref(), Some("555-1212"));
        assert!(contact.email.is_none());
    }

    #[test]
    fn test_new_rejects_blank_name() {
        assert!(Contact::new("", None, None).unwrap_err().is_validation_error());
        assert!(Contact::new("   \t", Some("555"), None)
            .unwrap_err()
            .is_validation_error());
    }

    #[test]
    fn test_has_direct_route() {
        assert!(!Contact::new("Jo", None, None).unwrap().has_direct_route());
        assert!(Contact::new("Jo", Some("555"), None)
            .unwrap()
            .has_direct_route());
        assert!(Contact::new("Jo", None, Some("jo@example.com"))
            .unwrap()
            .has_direct_route());
    }

    #[test]
    fn test_display() {
        let contact = Contact::new("Jo", Some("555-1212"), Some("jo@example.com")).unwrap();
        assert_eq!(contact.to_string(), "Jo (555-1212, jo@example.com)");
        assert_eq!(Contact::new("Sam", None, None).unwrap().to_string(), "Sam");
    }

    #[test]
    fn test_serializes_absent_fields_as_empty_strings() {
        let contact = Contact::new("Jo", Some("555-1212"), None).unwrap();
        let json = serde_json::to_string(&contact).unwrap();
        assert_eq!(json, r#"{"name":"Jo","phone":"555-1212","email":""}"#);
    }

    #[test]
    fn test_deserializes_missing_null_and_blank_fields() {
        let contact: Contact =
            serde_json::from_str(r#"{"name":"Jo","phone":"","email":null}"#).unwrap();
        assert!(contact.phone.is_none());
        assert!(contact.email.is_none());

        let contact: Contact = serde_json::from_str(r#"{"name":"Jo"}"#).unwrap();
        assert!(contact.phone.is_none());
    }
}
