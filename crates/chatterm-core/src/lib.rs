pub mod config;
pub mod error;
pub mod session;
pub mod state;
pub mod store;
pub mod transport;

// Re-export main types for convenience
pub use config::Config;
pub use error::{ChatError, TransportError};
pub use session::{ChatSession, SendOutcome, SendRequest, StartOutcome, StartRequest};
pub use state::{ChatMessage, ChatRole, Notice, NoticeLevel, SessionPhase};
pub use store::{FileSessionStore, MemoryStore, SessionStore};
pub use transport::{extract_reply, HttpTransport, Transport, NO_RESPONSE_FALLBACK};
