pub mod assist;
pub mod config;
pub mod error;
pub mod llm;
pub mod server;
pub mod store;

pub use crate::config::Config;
pub use crate::error::{LivroError, Result};
pub use crate::server::{build_router, AppState};
pub use crate::store::Store;
