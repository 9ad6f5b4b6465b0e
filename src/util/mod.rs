pub mod assert;
pub mod constants;
pub mod environment;

pub use assert::{assertion_error, fail, hard_assert};
pub use constants::CONSTANTS;
pub use environment::{emulator_host, is_cloud_functions};
