#![doc = include_str!("../README.md")]

pub mod cas;
pub mod credential;
pub mod error;
pub mod middleware;
pub mod phase;
pub mod return_url;
pub mod service_url;
#[cfg(test)]
mod testing;
pub mod types;

// Re-exports for convenient access
pub use cas::{
    Authentication, CasClient, CasProtocol, CasRequest, CasServer, CertValidation, ClientMode,
    ClientSetup, ProxyTicketError,
};
pub use credential::{CachePolicy, CredentialCache, CredentialCipher};
pub use error::Error;
pub use middleware::{
    AuthError, CasGateway, GatewayConfig, MailBackend, SessionStore, TemplateRender, protect,
};
pub use phase::{Hook, Phase, RequestDescriptor, classify};
pub use return_url::{QueryParams, ReturnUrl};
pub use service_url::RequestOrigin;
pub use types::{ApplicationSession, BackendTarget, SessionId, UserId};
