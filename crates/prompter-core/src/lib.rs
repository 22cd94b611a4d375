mod actors;
mod error;
mod events;
mod runtime;

pub use actors::*;
pub use error::*;
pub use events::*;
pub use runtime::*;
