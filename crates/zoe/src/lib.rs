//! ZOE, a Sui wallet assistant: a model that reads the chain and signs
//! transactions through a fixed set of wallet tools.
//!
//! The crate includes a CLI for use in the terminal. It can also be used as
//! a library: build a [`Startup`] from a [`Config`], pick a provider and
//! tools, then drive the resulting [`Session`] yourself or with one of the
//! [`driver`]s.

#![deny(missing_docs)]

#[allow(unused_imports)]
#[macro_use]
extern crate tracing;

pub mod chain;
pub mod coins;
pub mod config;
pub mod driver;
pub mod menu;
pub mod prompt;
mod provider;
mod session;
mod startup;
pub mod tools;
mod wallet;

pub use config::Config;
pub use prompt::Mode;
pub use provider::ProviderKind;
pub use session::{Session, SessionBuilder};
pub use startup::{Startup, StartupError};
pub use wallet::Wallet;

/// Re-exports of [`zoe_core`] crate.
pub mod core {
    pub use zoe_core::*;
}
