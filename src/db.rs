pub mod lead_repo;
pub use lead_repo::LeadRepository;
pub mod session_store;
pub use session_store::{FileSessionStore, MemorySessionStore, SessionStore};
