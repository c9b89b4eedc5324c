pub mod classifier;
pub mod feature;
pub mod keyword;
pub mod page_object;
pub mod step_file;
pub mod suite;
