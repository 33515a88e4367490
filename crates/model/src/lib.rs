pub mod core;
pub mod events;
pub mod pagination;
pub mod records;
pub mod transform;
