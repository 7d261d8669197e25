pub mod host;
pub mod sample;
pub mod threshold;
