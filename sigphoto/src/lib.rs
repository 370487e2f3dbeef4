pub mod config;
pub mod error;
pub mod image;
pub mod session;
pub mod source;
pub mod upload;

// Re-export commonly used types
pub use config::{NormalizationSpec, PhotoConfig};
pub use error::{SurfaceUnavailable, ValidationError};
pub use image::{ImageFormat, Masking, Normalized, NormalizedPhoto, Normalizer, PngCompression};
pub use session::{Commit, Session, Ticket};
pub use source::{resolve, PhotoReference};
pub use upload::{RawUpload, ValidationLimits};
