//! Domain model module declarations.

pub mod paper_status;
pub mod scan;
pub mod scanner_error;
