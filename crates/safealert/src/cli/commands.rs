//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::share::Provider;

/// Contact list commands.
#[derive(Debug, Subcommand)]
pub enum ContactsCommand {
    /// List trusted contacts
    List {
        /// Fail on corrupt storage instead of showing an empty list
        #[arg(long)]
        strict: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Add a trusted contact
    Add {
        /// Contact name
        name: String,

        /// Phone number, used for SMS
        #[arg(short, long)]
        phone: Option<String>,

        /// Email address
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Remove the contact at a position (as shown by `list`)
    Remove {
        /// Zero-based position
        index: usize,
    },

    /// Remove every contact
    Clear {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

/// Panic command arguments.
#[derive(Debug, Args)]
pub struct PanicCommand {
    /// Share channel (defaults to the configured provider)
    #[arg(long, value_enum)]
    pub via: Option<ProviderArg>,

    /// Address the share to the contact at this position
    #[arg(long, value_name = "INDEX")]
    pub to: Option<usize>,

    /// Latitude to report instead of asking the location provider
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude to report instead of asking the location provider
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Print the share URI instead of opening it
    #[arg(long)]
    pub dry_run: bool,

    /// Do not wait for the siren window to end
    #[arg(long)]
    pub no_wait: bool,
}

/// Compose command arguments.
#[derive(Debug, Args)]
pub struct ComposeCommand {
    /// Latitude
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude
    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,

    /// Also build a share URI for this provider
    #[arg(long, value_enum)]
    pub via: Option<ProviderArg>,

    /// Address the share URI to the contact at this position
    #[arg(long, value_name = "INDEX", requires = "via")]
    pub to: Option<usize>,

    /// Override the configured sender label
    #[arg(long)]
    pub from: Option<String>,
}

/// Alert command arguments.
#[derive(Debug, Args)]
pub struct AlertCommand {
    /// Feature card heading, e.g. "Live Location Sharing"
    pub label: String,
}

/// Siren command arguments.
#[derive(Debug, Args)]
pub struct SirenCommand {
    /// Seconds to play (defaults to the configured siren window)
    #[arg(short, long)]
    pub seconds: Option<u64>,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Share channel argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderArg {
    /// mailto: link
    Email,
    /// sms: link
    Sms,
    /// WhatsApp share dialog
    #[value(name = "whatsapp")]
    WhatsApp,
}

impl From<ProviderArg> for Provider {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Email => Self::Email,
            ProviderArg::Sms => Self::Sms,
            ProviderArg::WhatsApp => Self::WhatsApp,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_arg_conversion() {
        assert_eq!(Provider::from(ProviderArg::Email), Provider::Email);
        assert_eq!(Provider::from(ProviderArg::Sms), Provider::Sms);
        assert_eq!(Provider::from(ProviderArg::WhatsApp), Provider::WhatsApp);
    }

    #[test]
    fn test_provider_arg_names() {
        let names: Vec<_> = ProviderArg::value_variants()
            .iter()
            .filter_map(|v| v.to_possible_value())
            .map(|v| v.get_name().to_string())
            .collect();
        assert_eq!(names, ["email", "sms", "whatsapp"]);
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }

    #[test]
    fn test_contacts_command_debug() {
        let cmd = ContactsCommand::Add {
            name: "Jo".to_string(),
            phone: Some("555-1212".to_string()),
            email: None,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Add"));
        assert!(debug_str.contains("555-1212"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
