pub mod table;
pub mod frame;

pub use table::*;
pub use frame::*;
