pub mod eigen;
pub mod solve;

pub use eigen::*;
pub use solve::*;
