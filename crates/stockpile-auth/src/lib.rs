//! # stockpile-auth
//!
//! Session and token lifecycle management for the Stockpile client.
//!
//! This crate provides:
//! - The access/refresh token pair with derived expiry and skew handling
//! - The session state machine (login, logout, restore, expiry checks)
//! - Single-flight refresh coordination: any number of concurrent callers
//!   converge on one refresh network call and observe the same outcome
//! - Credential persistence behind a storage trait, with in-memory and
//!   file-backed implementations
//!
//! The network and navigation sides are traits ([`AuthApi`], [`Navigator`])
//! so the state machine is testable without a server and reusable behind
//! different frontends.
//!
//! ## Modules
//!
//! - [`token`] - Token types and expiry predicates
//! - [`profile`] - User profile and permission checks
//! - [`storage`] - Credential persistence
//! - [`api`] - Network and navigation seams
//! - [`refresh`] - Single-flight refresh coordinator
//! - [`session`] - The session controller state machine

pub mod api;
pub mod profile;
pub mod refresh;
pub mod session;
pub mod storage;
pub mod token;

pub use api::{AuthApi, Navigator, NoopNavigator};
pub use profile::UserProfile;
pub use refresh::RefreshCoordinator;
pub use session::{SessionController, SessionState};
pub use storage::{
    CredentialStorage, FileCredentialStorage, MemoryCredentialStorage, StoredSession,
};
pub use token::{AuthToken, LoginGrant, REFRESH_SKEW, TokenGrant};

pub use stockpile_core::{ApiError, ApiResult};
