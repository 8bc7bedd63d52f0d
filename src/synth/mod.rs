//! Synthetic stream generation: still image in, live video track out.

pub mod decode;
pub mod generator;
pub mod surface;

pub use decode::{decode_image, decode_image_async, encode_data_uri, parse_data_uri, DataUri};
pub use generator::SyntheticStreamGenerator;
pub use surface::Surface;
