pub mod middleware;
pub mod password_reset;
pub mod router;

pub use middleware::*;
pub use router::build_router;
