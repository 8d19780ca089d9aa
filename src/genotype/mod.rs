mod decoder;
mod store;

pub use decoder::{GenotypeCode, GenotypeDecoder, CALLS};
pub use store::{call_rate, GenotypeStore, SampleGenotypes};
