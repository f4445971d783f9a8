pub mod api;
pub mod config;
pub mod error;
pub mod explorer;
pub mod oauth;

pub use api::{ApiClient, ConnectionState, RequestOptions};
pub use config::{ClientSettings, Credentials, Environment};
pub use error::{AuthError, ConfigError, RequestError, TransportKind};
pub use oauth::Token;
