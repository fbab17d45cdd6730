pub mod audit;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod storage;
pub mod vault;

pub use crypto::{Argon2Params, MasterSecret};
pub use errors::{Result, VaultError};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use vault::{BackupCodec, CollisionPolicy, SessionState, VaultSession};
