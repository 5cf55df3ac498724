// Adapters layer: concrete implementations of the domain ports.

pub mod http;
pub mod notifier;
pub mod storage;

pub use http::ApiClient;
pub use notifier::{ConsoleNotifier, TracingNotifier};
pub use storage::{FileStore, MemoryStore};
