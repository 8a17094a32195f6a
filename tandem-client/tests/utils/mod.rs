pub mod wait;

pub use party::*;
pub use wait::*;
