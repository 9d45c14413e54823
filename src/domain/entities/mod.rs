pub mod checks;
pub mod records;
pub mod submission;
