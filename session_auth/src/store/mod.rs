mod memory;
mod redis;
mod types;

pub use memory::MemoryStore;
pub use self::redis::RedisStore;
pub use types::SessionStore;
