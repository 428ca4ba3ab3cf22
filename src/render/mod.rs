pub mod composite;
pub mod loss;
pub mod nerf;
pub mod ray;
pub mod sampler;

pub use composite::*;
pub use nerf::*;
pub use ray::*;
pub use sampler::*;
