pub mod cli;
pub mod client;
pub mod collectors;
pub mod exporter;
