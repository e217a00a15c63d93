//! Encoder blocks and the block stack
mod block;
mod stack;

pub use block::EncoderBlock;
pub use stack::Encoder;
