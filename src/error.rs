use std::fmt;

#[derive(Debug)]
pub enum KeyboardError {
    /// A timbre identifier that no voice recipe is registered for.
    UnsupportedTimbre { name: String },
    /// A note name outside the 12-tone set.
    UnknownNote { name: String },
    /// A key index past the end of the current key row.
    KeyOutOfRange { index: usize, len: usize },
    Config(serde_json::Error),
}

impl fmt::Display for KeyboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyboardError::UnsupportedTimbre { name } => write!(f, "Unsupported timbre '{name}'"),
            KeyboardError::UnknownNote { name } => write!(f, "Unknown note '{name}'"),
            KeyboardError::KeyOutOfRange { index, len } => {
                write!(f, "Key index {index} out of range (row has {len} keys)")
            }
            KeyboardError::Config(e) => write!(f, "Config error: {e}"),
        }
    }
}

impl std::error::Error for KeyboardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KeyboardError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for KeyboardError {
    fn from(e: serde_json::Error) -> Self {
        KeyboardError::Config(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offender() {
        let e = KeyboardError::UnsupportedTimbre { name: "kazoo".to_string() };
        assert_eq!(format!("{e}"), "Unsupported timbre 'kazoo'");

        let e = KeyboardError::KeyOutOfRange { index: 9, len: 7 };
        assert!(format!("{e}").contains("9"));
    }

    #[test]
    fn json_errors_convert() {
        let err = serde_json::from_str::<u32>("nope").unwrap_err();
        let e: KeyboardError = err.into();
        assert!(matches!(e, KeyboardError::Config(_)));
        assert!(std::error::Error::source(&e).is_some());
    }
}
