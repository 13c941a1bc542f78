pub mod config;
pub mod connectivity;
pub mod error;
pub mod queue;
pub mod record;
pub mod storage;
pub mod transport;

pub use config::ClientConfig;
pub use connectivity::watch_connectivity;
pub use error::{ClientError, ClientResult};
pub use queue::{OfflineQueue, QueueStats, SyncReport, MAX_RETRIES};
pub use record::{MutationKind, PendingRecord, QueueDocument};
pub use storage::{InMemoryStore, JsonFileStore, QueueStore};
pub use transport::{ApiClient, AuthResponse, MutationTransport};
