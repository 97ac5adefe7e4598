pub mod fallback;
pub mod musicxml_extract;

pub use fallback::*;
pub use musicxml_extract::*;
