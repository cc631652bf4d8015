// Adapters layer: concrete `QueryExecutor` implementations.

pub mod memory;
pub mod postgres;
