use thiserror::Error;

/// MIME types accepted for classification.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/jpg", "image/webp"];

pub fn is_allowed_image_type(content_type: &str) -> bool {
    ALLOWED_IMAGE_TYPES.contains(&content_type)
}

/// An uploaded image on its way to the detector.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// What the detector made of an image.
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    /// Detector answered with structured detections.
    Detections(serde_json::Value),
    /// Detector drew its detections onto the image and returned it.
    Annotated { bytes: Vec<u8>, content_type: String },
    /// Nothing recognisable in the image.
    NoObjects { message: String },
}

impl Prediction {
    /// Whether at least one object was detected. Only these predictions
    /// open a disposal session.
    pub fn has_detections(&self) -> bool {
        !matches!(self, Prediction::NoObjects { .. })
    }

    /// Interpret a JSON body. A missing or empty `detections` array means no objects.
    pub fn from_json(body: serde_json::Value) -> Self {
        let detected = body
            .get("detections")
            .and_then(|d| d.as_array())
            .is_some_and(|d| !d.is_empty());
        if detected {
            return Prediction::Detections(body);
        }

        let message = body
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or(NO_OBJECTS_MESSAGE)
            .to_string();
        Prediction::NoObjects { message }
    }
}

pub const NO_OBJECTS_MESSAGE: &str = "No objects detected in the image";

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Classifier API key is not configured")]
    NotConfigured,

    #[error("Prediction API is not responding at {base_url}")]
    Unavailable { base_url: String },

    #[error("Prediction API returned {status}: {detail}")]
    Upstream { status: u16, detail: String },

    #[error("Failed to make prediction request: {0}")]
    Request(String),
}

impl ClassifierError {
    /// HTTP status to report to our own client.
    pub fn status_code(&self) -> u16 {
        match self {
            ClassifierError::NotConfigured | ClassifierError::Request(_) => 500,
            ClassifierError::Unavailable { .. } => 503,
            ClassifierError::Upstream { status, .. } => *status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_with_detections() {
        let p = Prediction::from_json(json!({"detections": [{"label": "bottle"}]}));
        assert!(p.has_detections());
    }

    #[test]
    fn test_json_without_detections() {
        let p = Prediction::from_json(json!({"detections": []}));
        assert!(!p.has_detections());

        let p = Prediction::from_json(json!({"message": "nothing here"}));
        assert_eq!(
            p,
            Prediction::NoObjects {
                message: "nothing here".into()
            }
        );
    }

    #[test]
    fn test_annotated_counts_as_detection() {
        let p = Prediction::Annotated {
            bytes: vec![0xff, 0xd8],
            content_type: "image/jpeg".into(),
        };
        assert!(p.has_detections());
    }

    #[test]
    fn test_allowed_types() {
        assert!(is_allowed_image_type("image/webp"));
        assert!(!is_allowed_image_type("image/gif"));
        assert!(!is_allowed_image_type("application/pdf"));
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(ClassifierError::NotConfigured.status_code(), 500);
        assert_eq!(
            ClassifierError::Unavailable {
                base_url: "http://x".into()
            }
            .status_code(),
            503
        );
        assert_eq!(
            ClassifierError::Upstream {
                status: 422,
                detail: "bad".into()
            }
            .status_code(),
            422
        );
    }
}
