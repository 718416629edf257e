mod algorithms;
pub mod model;

pub use model::*;
