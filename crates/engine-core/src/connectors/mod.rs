pub mod sink;
pub mod stream;
