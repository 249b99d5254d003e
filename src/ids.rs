use chrono::Utc;
use uuid::Uuid;

use crate::errors::ApiError;

pub const OBJECT_ID_LEN: usize = 24;

/// Generates a 24 character lowercase hex document id: 4 bytes of unix
/// seconds followed by 8 random bytes, so ids sort roughly by creation time.
pub fn new_object_id() -> String {
    let seconds = Utc::now().timestamp() as u32;
    let random = Uuid::new_v4().simple().to_string();
    format!("{:08x}{}", seconds, &random[..16])
}

pub fn is_object_id(raw: &str) -> bool {
    raw.len() == OBJECT_ID_LEN && raw.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Validates a path segment before it reaches the store.
pub fn parse_object_id(field: &str, raw: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim();
    if is_object_id(trimmed) {
        Ok(trimmed.to_ascii_lowercase())
    } else {
        Err(ApiError::BadRequest(format!("Invalid {}", field)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_valid() {
        for _ in 0..32 {
            let id = new_object_id();
            assert_eq!(id.len(), OBJECT_ID_LEN);
            assert!(is_object_id(&id), "{} is not a valid id", id);
        }
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(!is_object_id(""));
        assert!(!is_object_id("1234"));
        assert!(!is_object_id("zzzzzzzzzzzzzzzzzzzzzzzz"));
        assert!(!is_object_id("65a1b2c3d4e5f6a7b8c9d0e1f"));
        assert!(parse_object_id("video id", "not-an-id").is_err());
    }

    #[test]
    fn normalises_case() {
        let parsed = parse_object_id("video id", "65A1B2C3D4E5F6A7B8C9D0E1").unwrap();
        assert_eq!(parsed, "65a1b2c3d4e5f6a7b8c9d0e1");
    }
}
