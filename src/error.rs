use thiserror::Error;

#[derive(Debug, Error)]
pub enum LivroError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid field `{field}`: {message}")]
    Validation { field: String, message: String },
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("database error: {0}")]
    Database(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl LivroError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LivroError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_field() {
        let err = LivroError::validation("title", "must not be empty");
        assert!(format!("{err}").contains("title"));
        let err = LivroError::NotFound("book");
        assert_eq!(format!("{err}"), "book not found");
    }
}
