pub mod extraction;
pub mod summarize;
pub mod aggregate;
pub mod scan;
