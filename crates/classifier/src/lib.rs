#![warn(clippy::unwrap_used)]

pub mod client;
pub mod types;

pub use client::{Classifier, YoloClient};
pub use types::{
    is_allowed_image_type, ClassifierError, ImageUpload, Prediction, ALLOWED_IMAGE_TYPES,
    NO_OBJECTS_MESSAGE,
};
