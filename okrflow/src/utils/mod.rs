//! Utility functions for UUID generation and timestamp handling.

pub mod timestamps;

pub use timestamps::{date_stamp, iso_timestamp, now_utc, parse_timestamp, Timestamp};

use uuid::Uuid;

/// Generates a new UUID v4.
#[must_use]
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_uuid_is_valid() {
        let id = generate_uuid();
        assert_eq!(id.get_version_num(), 4);
    }
}
