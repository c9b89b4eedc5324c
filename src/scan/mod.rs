pub mod scan_model;
pub mod scanner;
pub mod source;
