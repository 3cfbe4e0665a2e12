mod core;
pub mod layout;
pub mod options;

pub use self::core::Orchestrator;
