mod handle;
mod types;

pub use handle::SessionHandle;
pub use types::{SessionData, SessionState};
