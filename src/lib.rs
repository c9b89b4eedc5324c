pub mod artifact;
pub mod audit;
pub mod browser;
pub mod cli;
pub mod dom;
pub mod error;
pub mod gherkin;
pub mod locator;
pub mod report;
pub mod scan;
pub mod trace;

pub use error::ForgeError;
