use base64::{Engine, engine::general_purpose::STANDARD};

use crate::model::{apperror::ApplicationError, models::UploadedImageType};

/**
 * Name of the multipart field carrying the image.
 */
pub const IMAGE_FIELD: &str = "image";

/**
 * Image types accepted for upload.
 */
pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];

/**
 * Validates uploaded images and turns them into data urls. Nothing is stored server side.
 */
pub struct ImageUploadService {
    max_bytes: usize,
}

impl ImageUploadService {
    pub fn new(max_bytes: usize) -> Self {
        ImageUploadService { max_bytes }
    }

    /**
     * Largest accepted image in bytes. Readers may stop consuming the upload once they hold more than this.
     */
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /**
     * Checks the type before the body is read, so a wrong type is rejected without buffering the file.
     */
    pub fn check_content_type(&self, content_type: Option<&str>) -> Result<String, ApplicationError> {
        let content_type = content_type.map(str::to_ascii_lowercase).unwrap_or_default();
        if !ALLOWED_IMAGE_TYPES.contains(&content_type.as_str()) {
            return Err(ApplicationError::invalid_field(IMAGE_FIELD, "File type must be JPEG, PNG, WebP or GIF"));
        }
        Ok(content_type)
    }

    /**
     * Validates an uploaded image.
     *
     * # Arguments
     * `filename`: Client supplied name.
     * `content_type`: Declared mime type.
     * `bytes`: File contents. May be cut off just past the limit.
     *
     * # Returns
     * The data url with the file's metadata, or a validation error on the `image` field.
     */
    pub fn accept(&self, filename: Option<&str>, content_type: Option<&str>, bytes: &[u8]) -> Result<UploadedImageType, ApplicationError> {
        let content_type = self.check_content_type(content_type)?;
        if bytes.is_empty() {
            return Err(ApplicationError::invalid_field(IMAGE_FIELD, "File is empty"));
        }
        if bytes.len() > self.max_bytes {
            return Err(ApplicationError::invalid_field(IMAGE_FIELD, &format!("File must be at most {} bytes", self.max_bytes)));
        }
        let filename = filename.map(str::trim).filter(|name| !name.is_empty()).unwrap_or("image").to_string();
        let data_url = format!("data:{content_type};base64,{}", STANDARD.encode(bytes));
        tracing::debug!(%filename, size = bytes.len(), %content_type, "Image accepted");
        Ok(UploadedImageType { data_url, filename, size: bytes.len(), content_type })
    }

    /**
     * Error for a request without an image part.
     */
    pub fn missing_image() -> ApplicationError {
        ApplicationError::invalid_field(IMAGE_FIELD, "No image provided")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::apperror::ErrorType;

    const FIVE_MB: usize = 5 * 1024 * 1024;

    #[test]
    fn test_rejects_other_types() {
        let service = ImageUploadService::new(FIVE_MB);
        for content_type in [Some("image/svg+xml"), Some("application/pdf"), Some("text/plain"), None] {
            let error = service.accept(Some("a.bin"), content_type, b"abc").unwrap_err();
            assert_eq!(error.error_type, ErrorType::Validation);
            assert_eq!(error.field_errors[0].field, "image");
        }
    }

    #[test]
    fn test_rejects_one_byte_over_limit() {
        let service = ImageUploadService::new(FIVE_MB);
        let bytes = vec![0_u8; FIVE_MB + 1];
        let error = service.accept(Some("big.png"), Some("image/png"), &bytes).unwrap_err();
        assert_eq!(error.field_errors[0].field, "image");
        assert!(error.message.contains("at most"));
    }

    #[test]
    fn test_accepts_exact_limit() {
        let service = ImageUploadService::new(FIVE_MB);
        let bytes = vec![7_u8; FIVE_MB];
        let image = service.accept(Some("max.gif"), Some("image/gif"), &bytes).unwrap();
        assert_eq!(image.size, FIVE_MB);
    }

    #[test]
    fn test_data_url_decodes_to_original() {
        let service = ImageUploadService::new(FIVE_MB);
        let bytes: Vec<u8> = (0..=255_u8).cycle().take(10_000).collect();
        let image = service.accept(Some("photo.jpg"), Some("IMAGE/JPEG"), &bytes).unwrap();
        assert_eq!(image.content_type, "image/jpeg");
        assert_eq!(image.filename, "photo.jpg");
        let encoded = image.data_url.strip_prefix("data:image/jpeg;base64,").unwrap();
        let decoded = STANDARD.decode(encoded).unwrap();
        assert_eq!(decoded.len(), image.size);
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn test_rejects_empty_file() {
        let service = ImageUploadService::new(FIVE_MB);
        let error = service.accept(Some("x.webp"), Some("image/webp"), &[]).unwrap_err();
        assert_eq!(error.field_errors[0].message, "File is empty");
    }
}
