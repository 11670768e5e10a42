pub mod fs;
pub mod hash;
pub mod ordering;
pub mod process;
pub mod progress;
