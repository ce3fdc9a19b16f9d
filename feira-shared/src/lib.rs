pub mod actor;
pub mod events;
pub mod rate;

pub use actor::{Actor, Capability, Role};
