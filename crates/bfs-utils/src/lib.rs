pub mod background_runner;
pub mod deadline;
pub mod path_utils;

pub use background_runner::BackgroundRunner;
pub use deadline::with_deadline;
