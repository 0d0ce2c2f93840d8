pub mod observability;
pub mod runtime;
