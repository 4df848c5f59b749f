//! `safealert` - A personal-safety toolkit
//!
//! This library keeps a list of trusted contacts, builds an emergency message
//! around the device's current position, and hands it to a mail, SMS or
//! WhatsApp share target. It also sounds a siren and plays a fake incoming
//! call on demand.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod audio;
pub mod cli;
pub mod config;
pub mod contact;
pub mod dispatcher;
pub mod error;
pub mod fake_call;
pub mod launcher;
pub mod location;
pub mod logging;
pub mod message;
pub mod panic;
pub mod platform;
pub mod share;
pub mod shortcut;
pub mod status;
pub mod storage;

pub use audio::{AudioPlayer, Clip, SilentAudioPlayer, SystemAudioPlayer};
pub use config::Config;
pub use contact::Contact;
pub use dispatcher::{AlertDispatcher, Feature};
pub use error::{Error, Result};
pub use fake_call::{CallState, FakeCall};
pub use launcher::{PrintLauncher, SystemLauncher, UriLauncher};
pub use location::{get_location, Coordinate, LocationOptions, LocationProvider};
pub use logging::init_logging;
pub use message::{build_map_link, compose_message};
pub use panic::{PanicOutcome, PanicRequest, PanicSequence, PanicSettings};
pub use share::{compose_share_target, Provider, ShareRegistry, ShareUri};
pub use shortcut::{Focus, PanicShortcut};
pub use status::{StatusKind, StatusLine};
pub use storage::{ContactStore, MemoryBackend, SqliteBackend, StorageBackend};
