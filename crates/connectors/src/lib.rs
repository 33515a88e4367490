pub mod capture;
pub mod error;
pub mod kinesis;
pub mod memory;
