pub mod candidate;
pub mod data_models;

pub use candidate::*;
pub use data_models::*;
