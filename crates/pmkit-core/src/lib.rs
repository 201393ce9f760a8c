pub mod auth;
pub mod baseline;
pub mod config;
pub mod credentials;
pub mod detect;
pub mod doctor;
pub mod error;
pub mod exclusion;
pub mod fetch;
pub mod github;
pub mod hash;
pub mod install;
pub mod io;
pub mod mcp;
pub mod metadata;
pub mod notifier;
pub mod paths;
pub mod prompt;
pub mod remote;
pub mod snapshot;
pub mod system;
pub mod uninstall;
pub mod update;
pub mod version;

pub use error::{PmKitError, Result};
