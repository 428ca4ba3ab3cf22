#![allow(clippy::excessive_precision)]
#![allow(missing_docs)]

pub mod backend;
pub mod error;
pub mod function;
pub mod preset;
pub mod render;
pub mod scene;
