//! Infrastructure layer - external adapters (database, network, filesystem).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod config;
pub mod key_value;
pub mod local_storage;
pub mod remote;

pub use config::{ensure_config_exists, load_config, save_config};
pub use key_value::{KeyValueStore, SessionStorage};
pub use local_storage::LocalStorage;
pub use remote::{HttpTransport, QuoteTransport};
