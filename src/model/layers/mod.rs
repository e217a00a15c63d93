//! Neural network layers

mod linear;
mod ffn;
mod embedding;
mod norm;

pub use linear::Linear;
pub use ffn::FeedForward;
pub use embedding::Embedding;
pub use norm::LayerNorm;
