pub mod enums;
pub mod kpi;
pub mod visit;

pub use enums::*;
pub use kpi::*;
pub use visit::*;
