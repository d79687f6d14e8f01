//! Library exports so integration tests and `main.rs` share one module tree.

pub mod analyzer;
pub mod auto_recorder;
pub mod bus;
pub mod domain;
pub mod external;
pub mod matcher;
pub mod server;
pub mod state_machine;
pub mod storage;
pub mod utils;
pub mod weapon;
