/// Errors produced while building commands or decoding replies
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Reply body shorter than the structure it must fill
    #[error("malformed {what}: need {needed} bytes, got {got}")]
    Malformed {
        what: &'static str,
        needed: usize,
        got: usize,
    },
    /// Reply header inconsistent with the length accounting
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("password is {len} bytes, at most {max} fit the configuration frame")]
    PasswordTooLong { len: usize, max: usize },
}

impl DecodeError {
    pub(crate) fn short(what: &'static str, needed: usize, got: usize) -> Self {
        DecodeError::Malformed { what, needed, got }
    }
}
