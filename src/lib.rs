pub mod model;
pub use model::{
    Embedding, Encoder, EncoderBlock, EncoderConfig, FeedForward, LayerNorm, Linear, ModelError,
    MultiHeadAttention, PositionalEncoding, SequenceEncoder,
};

pub mod utils;
pub use utils::{ParameterWithGrad, build_causal_mask, build_dropout_rng};
