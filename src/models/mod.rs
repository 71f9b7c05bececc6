pub mod enums;
pub mod document;
pub mod fields;
pub mod quality;

pub use enums::*;
pub use document::*;
pub use fields::*;
pub use quality::*;
