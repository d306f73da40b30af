//! Authorization table access for the Latchkey door controller.
//!
//! The controller asks one question of storage: which record, if any, has
//! this key? The [`AuthorizationSource`] trait answers it, re-reading the
//! backing store on every call so edits take effect immediately.
//!
//! # Backends
//!
//! - [`CsvAuthorizationSource`]: `key,name,type` file (default
//!   `/opt/door/keys.csv`)
//! - [`SqliteAuthorizationSource`]: `authorizations` table in SQLite
//! - [`MemoryAuthorizationSource`]: shared in-memory table for tests and
//!   simulation
//!
//! # Examples
//!
//! ```no_run
//! use latchkey_storage::{AuthorizationSource, CsvAuthorizationSource};
//!
//! # async fn example() -> latchkey_storage::StorageResult<()> {
//! let source = CsvAuthorizationSource::new("/opt/door/keys.csv");
//!
//! match source.find("1234").await? {
//!     Some(record) => println!("Access granted for {}", record),
//!     None => println!("Access denied for 1234"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Security Considerations
//!
//! Keys are compared with [`AuthorizationRecord::matches`], which runs in
//! constant time via the `subtle` crate. SQL lookups use parameterized
//! statements.
//!
//! [`AuthorizationRecord::matches`]: latchkey_core::AuthorizationRecord::matches

pub mod csv_file;
pub mod error;
pub mod memory;
pub mod source;
pub mod sqlite;

pub use csv_file::CsvAuthorizationSource;
pub use error::{StorageError, StorageResult};
pub use memory::MemoryAuthorizationSource;
pub use source::{AnyAuthorizationSource, AuthorizationSource};
pub use sqlite::{AUTHORIZATIONS_SCHEMA, SqliteAuthorizationSource};
