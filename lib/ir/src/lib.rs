mod convert;
mod error;
mod expr;
mod node;
mod render;
pub mod transform;

pub use convert::*;
pub use error::*;
pub use node::*;
pub use render::*;
