//! Share targets.
//!
//! Each provider turns a message into a URI for an external app. URI
//! construction is a [`ShareStrategy`] looked up by [`Provider`] in a
//! [`ShareRegistry`], so a platform-specific variant (say, a different `sms:`
//! recipient syntax) can be swapped in without touching callers.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::contact::Contact;
use crate::error::{Error, Result};

/// WhatsApp's generic share endpoint.
pub const WHATSAPP_SHARE_URL: &str = "https://api.whatsapp.com/send?text=";

/// Where a share is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// A `mailto:` link.
    Email,
    /// An `sms:` link.
    Sms,
    /// WhatsApp's web share dialog.
    #[serde(rename = "whatsapp")]
    WhatsApp,
}

impl Provider {
    /// All providers, in menu order.
    pub const ALL: [Provider; 3] = [Provider::Email, Provider::Sms, Provider::WhatsApp];
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
            Self::Sms => write!(f, "sms"),
            Self::WhatsApp => write!(f, "whatsapp"),
        }
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" | "mail" => Ok(Self::Email),
            "sms" | "text" => Ok(Self::Sms),
            "whatsapp" => Ok(Self::WhatsApp),
            _ => Err(Error::UnknownProvider(s.to_string())),
        }
    }
}

/// How the platform should open a share URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenIn {
    /// Replace the current view, as mail and SMS handlers do.
    CurrentContext,
    /// Open alongside, as a web page in a new window or tab.
    NewContext,
}

/// A composed share target, ready to hand to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareUri {
    /// Provider that built the URI.
    pub provider: Provider,
    /// The URI itself.
    pub uri: String,
    /// How it should be opened.
    pub open_in: OpenIn,
}

/// Builds the URI for one provider.
pub trait ShareStrategy: Send + Sync {
    /// The provider this strategy serves.
    fn provider(&self) -> Provider;

    /// Build the share URI.
    ///
    /// `contact` is a hint; a strategy may ignore it when the provider has
    /// no way to address a single recipient.
    fn build(&self, message: &str, subject: &str, contact: Option<&Contact>) -> ShareUri;
}

/// `mailto:[email]?subject=..&body=..`
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailStrategy;

impl ShareStrategy for EmailStrategy {
    fn provider(&self) -> Provider {
        Provider::Email
    }

    fn build(&self, message: &str, subject: &str, contact: Option<&Contact>) -> ShareUri {
        let recipient = contact.and_then(|c| c.email.as_deref()).unwrap_or("");
        ShareUri {
            provider: Provider::Email,
            uri: format!(
                "mailto:{recipient}?subject={}&body={}",
                urlencoding::encode(subject),
                urlencoding::encode(message)
            ),
            open_in: OpenIn::CurrentContext,
        }
    }
}

/// `sms:[phone]?&body=..`
///
/// The `?&` form is what both iOS and Android accept for a body without a
/// recipient; recipient syntax still varies by platform.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmsStrategy;

impl ShareStrategy for SmsStrategy {
    fn provider(&self) -> Provider {
        Provider::Sms
    }

    fn build(&self, message: &str, _subject: &str, contact: Option<&Contact>) -> ShareUri {
        let recipient = contact.and_then(|c| c.phone.as_deref()).unwrap_or("");
        ShareUri {
            provider: Provider::Sms,
            uri: format!("sms:{recipient}?&body={}", urlencoding::encode(message)),
            open_in: OpenIn::CurrentContext,
        }
    }
}

/// WhatsApp's generic share dialog. WhatsApp offers no way to preselect a
/// recipient here, so the contact is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhatsAppStrategy;

impl ShareStrategy for WhatsAppStrategy {
    fn provider(&self) -> Provider {
        Provider::WhatsApp
    }

    fn build(&self, message: &str, _subject: &str, _contact: Option<&Contact>) -> ShareUri {
        ShareUri {
            provider: Provider::WhatsApp,
            uri: format!("{WHATSAPP_SHARE_URL}{}", urlencoding::encode(message)),
            open_in: OpenIn::NewContext,
        }
    }
}

/// Strategies keyed by provider.
pub struct ShareRegistry {
    strategies: HashMap<Provider, Box<dyn ShareStrategy>>,
}

impl fmt::Debug for ShareRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut providers: Vec<_> = self.strategies.keys().collect();
        providers.sort_by_key(|p| p.to_string());
        f.debug_struct("ShareRegistry")
            .field("providers", &providers)
            .finish()
    }
}

impl Default for ShareRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(EmailStrategy));
        registry.register(Box::new(SmsStrategy));
        registry.register(Box::new(WhatsAppStrategy));
        registry
    }
}

impl ShareRegistry {
    /// A registry with no strategies.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Add a strategy, replacing any existing one for the same provider.
    pub fn register(&mut self, strategy: Box<dyn ShareStrategy>) {
        self.strategies.insert(strategy.provider(), strategy);
    }

    /// Whether `provider` has a strategy.
    #[must_use]
    pub fn supports(&self, provider: Provider) -> bool {
        self.strategies.contains_key(&provider)
    }

    /// Build the share URI for `provider`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoStrategy`] if nothing is registered for `provider`.
    pub fn compose(
        &self,
        provider: Provider,
        message: &str,
        subject: &str,
        contact: Option<&Contact>,
    ) -> Result<ShareUri> {
        self.strategies
            .get(&provider)
            .map(|strategy| strategy.build(message, subject, contact))
            .ok_or_else(|| Error::NoStrategy(provider.to_string()))
    }
}

/// Build a share URI with the stock strategy for `provider`.
#[must_use]
pub fn compose_share_target(
    provider: Provider,
    message: &str,
    subject: &str,
    contact: Option<&Contact>,
) -> ShareUri {
    match provider {
        Provider::Email => EmailStrategy.build(message, subject, contact),
        Provider::Sms => SmsStrategy.build(message, subject, contact),
        Provider::WhatsApp => WhatsAppStrategy.build(message, subject, contact),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jo() -> Contact {
        Contact::new("Jo", Some("555-1212"), Some("jo@example.com")).unwrap()
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("email".parse::<Provider>().unwrap(), Provider::Email);
        assert_eq!("SMS".parse::<Provider>().unwrap(), Provider::Sms);
        assert_eq!(" WhatsApp ".parse::<Provider>().unwrap(), Provider::WhatsApp);
        assert!(matches!(
            "pigeon".parse::<Provider>(),
            Err(Error::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_provider_display_round_trips() {
        for provider in Provider::ALL {
            assert_eq!(provider.to_string().parse::<Provider>().unwrap(), provider);
        }
    }

    #[test]
    fn test_provider_serde_names() {
        assert_eq!(
            serde_json::to_string(&Provider::WhatsApp).unwrap(),
            "\"whatsapp\""
        );
        let provider: Provider = serde_json::from_str("\"email\"").unwrap();
        assert_eq!(provider, Provider::Email);
    }

    #[test]
    fn test_email_broadcast() {
        let share = compose_share_target(Provider::Email, "Help me", "SOS now", None);
        assert_eq!(share.uri, "mailto:?subject=SOS%20now&body=Help%20me");
        assert_eq!(share.open_in, OpenIn::CurrentContext);
    }

    #[test]
    fn test_email_to_contact() {
        let share = compose_share_target(Provider::Email, "a&b", "s", Some(&jo()));
        assert_eq!(share.uri, "mailto:jo@example.com?subject=s&body=a%26b");
    }

    #[test]
    fn test_email_contact_without_address_is_broadcast() {
        let phone_only = Contact::new("Sam", Some("555"), None).unwrap();
        let share = compose_share_target(Provider::Email, "x", "s", Some(&phone_only));
        assert!(share.uri.starts_with("mailto:?"));
    }

    #[test]
    fn test_sms_broadcast_and_addressed() {
        let share = compose_share_target(Provider::Sms, "Need help\nnow", "ignored", None);
        assert_eq!(share.uri, "sms:?&body=Need%20help%0Anow");

        let share = compose_share_target(Provider::Sms, "hi", "ignored", Some(&jo()));
        assert_eq!(share.uri, "sms:555-1212?&body=hi");
        assert_eq!(share.open_in, OpenIn::CurrentContext);
    }

    #[test]
    fn test_whatsapp_ignores_contact() {
        let generic = compose_share_target(Provider::WhatsApp, "help", "s", None);
        let addressed = compose_share_target(Provider::WhatsApp, "help", "s", Some(&jo()));

        assert_eq!(generic, addressed);
        assert_eq!(addressed.uri, "https://api.whatsapp.com/send?text=help");
        assert!(!addressed.uri.contains("555"));
        assert_eq!(addressed.open_in, OpenIn::NewContext);
    }

    #[test]
    fn test_map_link_is_encoded_in_body() {
        let share = compose_share_target(
            Provider::Sms,
            "https://www.google.com/maps/search/?api=1&query=37,-122",
            "",
            None,
        );
        assert!(share
            .uri
            .contains("https%3A%2F%2Fwww.google.com%2Fmaps%2Fsearch%2F%3Fapi%3D1%26query%3D37%2C-122"));
    }

    struct SmsToSemicolonList;

    impl ShareStrategy for SmsToSemicolonList {
        fn provider(&self) -> Provider {
            Provider::Sms
        }

        fn build(&self, message: &str, _subject: &str, contact: Option<&Contact>) -> ShareUri {
            let to = contact.and_then(|c| c.phone.as_deref()).unwrap_or("");
            ShareUri {
                provider: Provider::Sms,
                uri: format!("sms:{to};?body={}", urlencoding::encode(message)),
                open_in: OpenIn::CurrentContext,
            }
        }
    }

    #[test]
    fn test_registry_defaults_match_free_function() {
        let registry = ShareRegistry::default();
        for provider in Provider::ALL {
            assert!(registry.supports(provider));
            assert_eq!(
                registry.compose(provider, "m", "s", Some(&jo())).unwrap(),
                compose_share_target(provider, "m", "s", Some(&jo()))
            );
        }
    }

    #[test]
    fn test_registry_strategy_override() {
        let mut registry = ShareRegistry::default();
        registry.register(Box::new(SmsToSemicolonList));

        let share = registry
            .compose(Provider::Sms, "hi", "", Some(&jo()))
            .unwrap();
        assert_eq!(share.uri, "sms:555-1212;?body=hi");

        // Other providers are untouched
        let email = registry.compose(Provider::Email, "hi", "s", None).unwrap();
        assert!(email.uri.starts_with("mailto:"));
    }

    #[test]
    fn test_empty_registry() {
        let registry = ShareRegistry::empty();
        assert!(matches!(
            registry.compose(Provider::Email, "m", "s", None),
            Err(Error::NoStrategy(_))
        ));
    }
}
