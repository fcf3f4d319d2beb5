mod envelope;
mod transport;

pub use transport::*;
