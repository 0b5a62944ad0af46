pub mod csv_io;
pub mod json_io;

pub use csv_io::*;
pub use json_io::*;
