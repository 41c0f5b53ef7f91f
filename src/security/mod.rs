pub mod secrets;
pub mod signature;
pub mod token;

pub use secrets::{HookSecrets, normalize_secret};
pub use signature::{
    SignedParts, compute_signature, extract_signed_parts, replay_key, verify_signature,
};
pub use token::{bearer_token, constant_time_eq, token_authorized};
