pub mod logging;

pub use logging::{build_subscriber, env_filter, init_logging};
