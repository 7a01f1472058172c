pub mod change_feed;
pub mod identity;
pub mod memory_store;
pub mod pg_store;
pub mod wish_llm;

pub use identity::InMemoryIdentityProvider;
pub use memory_store::InMemoryDocumentStore;
pub use pg_store::PgDocumentStore;
pub use wish_llm::OpenAiWishAdapter;
