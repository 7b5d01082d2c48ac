pub mod bins;
pub mod rdf;
pub mod weights;
