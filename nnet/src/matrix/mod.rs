mod packed;

pub use packed::{SpMatrix, packed_dim};
