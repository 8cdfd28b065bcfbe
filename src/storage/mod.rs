mod client;
mod file;
mod inmemory;

pub use client::ClientStorage;
pub use file::FileStore;
pub use inmemory::InMemoryStore;
