pub mod domain;
pub mod frameworks;
pub mod interface_adapters;
pub mod use_cases;

pub use frameworks::config::NodeConfig;
pub use frameworks::node::{run, run_with_config};
