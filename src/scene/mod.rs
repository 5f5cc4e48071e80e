mod data;
mod element;

pub use data::*;
pub use element::*;
