pub mod diagnostics;
pub mod failure;
pub mod logging;
pub mod recognizer;
pub mod response;

pub use diagnostics::*;
pub use failure::*;
pub use logging::*;
pub use recognizer::*;
pub use response::*;
