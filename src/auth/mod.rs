/// OAuth token requests against the Microsoft identity platform.
pub mod credentials;
/// Token selection and caching.
pub mod token;

pub use token::{acquire_token, AuthConfig};
