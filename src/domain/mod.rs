pub mod horizon;
pub mod types;

pub use horizon::*;
pub use types::*;
