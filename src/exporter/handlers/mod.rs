mod health;
mod index;
mod metrics;

pub use health::health;
pub use index::index;
pub use metrics::metrics;
