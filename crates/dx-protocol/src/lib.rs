pub mod dtc;
pub mod mode;
pub mod record;

pub use dtc::*;
pub use mode::*;
pub use record::*;
