pub mod pipeline;
pub mod writer;
