pub mod chunk;
pub mod tensor_extensions;

pub use chunk::*;
pub use tensor_extensions::*;
