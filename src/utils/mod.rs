// Utility functions

pub mod logger;
pub mod poll;

pub use logger::*;
pub use poll::*;
