pub mod args;
pub mod backup;
pub mod host;
pub mod paths;
pub mod registry;
pub mod stream;

pub use args::{CommandArgumentSet, HOST_ARGS, UNSET};
pub use backup::{make_local_backup, LocalBackupEntry};
pub use host::{HostOptions, IndexingHost};
pub use paths::{cache_path, normalize_key};
pub use registry::FileRegistry;
pub use stream::{StreamHeader, StreamWriter};
