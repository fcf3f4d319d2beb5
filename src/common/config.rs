use super::{ConfigurationSnafu, Result};

/// If the value begins with an '@', read the preceding file path,
/// otherwise returns the value.
///
/// prefix is used to provide context in case of an error.
pub fn key_file_or_string(value: String, prefix: &str) -> Result<String> {
    Ok(match value.strip_prefix('@') {
        Some(key_file) => std::fs::read_to_string(key_file)
            .map_err(|err| {
                ConfigurationSnafu {
                    message: format!("Failed to read {prefix} from {key_file}: {err}"),
                }
                .build()
            })?
            .trim()
            .into(),
        None => value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_value_is_returned() {
        let value = key_file_or_string("hunter2".into(), "password").unwrap();
        assert_eq!(value, "hunter2");
    }

    #[test]
    fn prefixed_value_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret");
        std::fs::write(&path, "from_file\n").unwrap();

        let value = key_file_or_string(format!("@{}", path.display()), "password").unwrap();
        assert_eq!(value, "from_file");
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let err = key_file_or_string("@/nonexistent/secret".into(), "password").unwrap_err();
        assert!(matches!(err, crate::common::Error::ConfigurationError { .. }));
        assert!(err.to_string().contains("password"));
    }
}
