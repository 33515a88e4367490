pub mod factory;
pub mod orchestrator;
