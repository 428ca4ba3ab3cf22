/// The distance assigned to the last sample of every ray.
pub const DISTANCE_FAR: f32 = 1e10;

/// The floor of disparity and accumulated opacity.
pub const DISPARITY_EPSILON: f32 = 1e-10;

/// Added to `1 - alpha` before accumulating transmittance.
pub const TRANSMITTANCE_EPSILON: f32 = 1e-10;

/// Added to every coarse weight before building the PDF.
pub const WEIGHT_EPSILON: f32 = 1e-5;

/// The CDF gap under which a bin is treated as empty.
pub const CDF_GAP_EPSILON: f32 = 1e-5;

/// The default number of rays per render chunk.
pub const RAY_CHUNK_SIZE: usize = 1 << 15;

/// The default number of points per field query chunk.
pub const POINT_CHUNK_SIZE: usize = 1 << 16;

/// The maximum number of comparisons per chunk of the inverse CDF search.
pub const CDF_SEARCH_SIZE_MAX: usize = 1 << 22;
