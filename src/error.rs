pub type RetouchResult<T> = Result<T, RetouchError>;

#[derive(thiserror::Error, Debug)]
pub enum RetouchError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("compositing error: {0}")]
    Compositing(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RetouchError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn compositing(msg: impl Into<String>) -> Self {
        Self::Compositing(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            RetouchError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(RetouchError::decode("x").to_string().contains("decode error:"));
        assert!(RetouchError::encode("x").to_string().contains("encode error:"));
        assert!(
            RetouchError::compositing("x")
                .to_string()
                .contains("compositing error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = RetouchError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
