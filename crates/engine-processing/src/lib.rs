pub mod decoder;
pub mod error;
pub mod producer;
pub mod state_manager;
pub mod transform;
