//! Read side: fold stored visits into dashboard views.

pub mod aggregate;
pub mod kpi;
pub mod report;

pub use aggregate::*;
pub use kpi::*;
pub use report::*;
