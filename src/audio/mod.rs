pub mod decoder;
pub mod encoder;
pub mod loader;
pub mod resample;
