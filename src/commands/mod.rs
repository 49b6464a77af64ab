pub mod index;
pub mod serve;
