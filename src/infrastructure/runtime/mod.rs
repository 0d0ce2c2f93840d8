pub mod tokio;

pub use self::tokio::{ManualTimeService, TokioTimeService};
