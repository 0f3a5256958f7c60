//! Strongbox service layer
//!
//! The security and data engine behind the HTTP surface:
//!
//! - [`auth`] — registration, login, OAuth find-or-link, bearer and
//!   refresh credentials, revocation
//! - [`vault`] — encrypted entry CRUD, search, health analysis,
//!   export/import
//! - [`org`] — collections and tags
//! - [`share`] — one-time capability tokens with view-count and expiry
//!   enforcement
//! - [`audit`] — append-only action log, written as a side effect of the
//!   security-relevant operations above
//!
//! Services hold `Arc<dyn Store>` seams from `strongbox-store`, so tests
//! run them against the in-memory backend unchanged.

#![forbid(unsafe_code)]

pub mod audit;
pub mod auth;
mod error;
pub mod org;
mod password;
pub mod share;
mod strength;
pub mod tokens;
pub mod vault;

pub use audit::{AuditQuery, AuditService, ClientInfo};
pub use auth::{AccountView, AuthService, AuthTokens, RegisterInput};
pub use error::{FieldError, Result, ServiceError};
pub use org::OrgService;
pub use share::{CreateShareInput, ShareService, ShareView, SharedEntryView};
pub use strength::strength_score;
pub use tokens::{BearerClaims, TokenIssuer};
pub use vault::{
    CreateEntryInput, EntryDetail, EntrySummary, HealthReport, ImportEntryInput, ImportReport,
    UpdateEntryInput, VaultService,
};
