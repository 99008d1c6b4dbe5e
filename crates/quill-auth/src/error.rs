use jsonwebtoken::errors::Error as JwtError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("JWT error: {0}")]
    JwtError(#[from] JwtError),
}

impl Error {
    pub fn is_expiration(&self) -> bool {
        let Error::JwtError(e) = self;
        matches!(e.kind(), jsonwebtoken::errors::ErrorKind::ExpiredSignature)
    }
}
