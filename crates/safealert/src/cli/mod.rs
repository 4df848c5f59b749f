//! Command-line interface for safealert.
//!
//! This module provides the CLI structure and command handlers for the
//! `safealert` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AlertCommand, ComposeCommand, ConfigCommand, ContactsCommand, OutputFormat, PanicCommand,
    ProviderArg, SirenCommand,
};

/// safealert - Get help to the people you trust
///
/// Keeps a list of trusted contacts and, on panic, shares your current
/// location with them by email, SMS or WhatsApp while sounding a siren.
#[derive(Debug, Parser)]
#[command(name = "safealert")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage trusted contacts
    #[command(subcommand)]
    Contacts(ContactsCommand),

    /// Share your location with trusted contacts and sound the siren
    Panic(PanicCommand),

    /// Print the emergency message for a position
    Compose(ComposeCommand),

    /// Run a feature card by its heading
    Alert(AlertCommand),

    /// Sound the siren
    Siren(SirenCommand),

    /// Ring a fake incoming call until Enter is pressed
    FakeCall,

    /// Interactive console with the panic shortcut
    Console,

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.verbose, self.quiet)
    }
}
