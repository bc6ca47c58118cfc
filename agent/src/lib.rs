//! Permission-synchronization core for Dynatrace account IAM groups.

pub mod account;
pub mod api;
pub mod backend;
pub mod batch;
pub mod defaults;
pub mod directory;
pub mod error;
pub mod query;
pub mod reconcile;
pub mod retry;
pub mod testing;
pub mod token;

pub use account::Account;
pub use backend::{HttpIamBackend, IamBackend};
pub use batch::{apply_defaults_batch, teams_from_lines, BatchResult};
pub use defaults::{DefaultsDocument, DefaultsStore};
pub use directory::GroupDirectory;
pub use error::{IamError, Result};
pub use reconcile::{GrantAction, GrantOutcome, ReconcileReport};
pub use retry::RetryPolicy;
pub use token::{TokenProvider, TokenScope};
