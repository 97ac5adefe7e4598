pub mod omr;
pub mod storage;
pub mod types;

pub use omr::*;
pub use storage::*;
pub use types::*;
