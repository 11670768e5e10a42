pub mod descriptor;
pub mod identity;

pub use descriptor::*;
pub use identity::*;
