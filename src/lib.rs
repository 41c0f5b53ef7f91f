#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use
)]

pub mod config;
pub mod error;
#[doc(hidden)]
pub mod platform;
pub mod replay;
pub mod security;
pub mod transport;

pub use config::{ReceiverConfig, ReplayBackend};
pub use error::{ConfigError, HookError, SignatureError};
