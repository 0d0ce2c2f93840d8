pub mod account;
pub mod password_reset;

pub use account::*;
pub use password_reset::*;
