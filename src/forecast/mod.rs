pub mod driver;
pub mod engine;
pub mod lags;
pub mod weather;

pub use driver::*;
pub use engine::*;
pub use lags::*;
pub use weather::*;
