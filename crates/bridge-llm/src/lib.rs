mod client;
mod env;
mod error;
mod prompt;

pub use client::*;
pub use env::*;
pub use error::*;
pub use prompt::*;
