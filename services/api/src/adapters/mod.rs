pub mod db;
pub mod http_client;
pub mod memory;

pub use db::DbAdapter;
pub use http_client::HttpProgressClient;
pub use memory::InMemoryRepository;
