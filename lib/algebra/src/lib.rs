mod error;
mod lower;
mod node;

pub use error::*;
pub use lower::*;
pub use node::*;
