mod compare;
mod config;
mod engine;
mod gaps;
mod generation;
mod matcher;
mod merge;
mod normalize;
mod reconstruct;
mod script;
mod similarity;
mod trigger;
mod types;

pub use compare::*;
pub use config::*;
pub use engine::*;
pub use gaps::*;
pub use generation::*;
pub use matcher::*;
pub use merge::*;
pub use normalize::*;
pub use reconstruct::*;
pub use script::*;
pub use similarity::*;
pub use trigger::*;
pub use types::*;
