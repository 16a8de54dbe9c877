//! Topic name rules shared by clients and transports.

/// Maximum topic name length.
pub const MAX_TOPIC_LENGTH: usize = 256;

/// Validate a topic name.
///
/// # Errors
///
/// Returns a static description of the first rule the name breaks.
pub fn validate_topic(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("Topic name cannot be empty");
    }
    if name.len() > MAX_TOPIC_LENGTH {
        return Err("Topic name too long");
    }
    if name.starts_with('$') {
        return Err("Topic names starting with '$' are reserved");
    }
    if !name.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
        return Err("Topic name contains invalid characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_validation() {
        assert!(validate_topic("observe").is_ok());
        assert!(validate_topic("room:lobby").is_ok());
        assert!(validate_topic("").is_err());
        assert!(validate_topic("$system").is_err());
        assert!(validate_topic("bad\ntopic").is_err());
        assert!(validate_topic("caf\u{e9}").is_err());

        let long_name = "a".repeat(MAX_TOPIC_LENGTH + 1);
        assert!(validate_topic(&long_name).is_err());
    }
}
