pub mod auth;
pub mod error;
pub mod handlers;
pub mod types;

pub use auth::*;
pub use error::*;
pub use handlers::*;
pub use types::*;

#[cfg(test)]
mod tests;
