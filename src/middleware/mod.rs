//! CAS gateway middleware for Axum webmail front ends.
//!
//! Replaces the webmail login form with a CAS round-trip and bridges the CAS
//! identity into a mail backend login.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cas_gateway::middleware::{CasGateway, GatewayConfig, protect};
//!
//! // 1. Implement CasProtocol, SessionStore and MailBackend for your app
//! // 2. Configure from environment
//! let config = GatewayConfig::from_env()?;
//!
//! // 3. Wrap the webmail router
//! let gateway = CasGateway::new(config, cas, sessions, imap);
//! let app = protect(webmail_router, gateway.clone());
//!
//! // 4. Ask the gateway before giving up on a backend connection
//! let connected = gateway.backend_connect(&parts, false).await?;
//! ```

mod config;
mod cookies;
mod error;
mod intercept;
mod phases;
mod state;
mod traits;
mod types;

pub use config::GatewayConfig;
pub use error::AuthError;
pub use intercept::{intercept, protect};
pub use state::CasGateway;
pub use traits::{MailBackend, SessionStore};
pub use types::TemplateRender;
