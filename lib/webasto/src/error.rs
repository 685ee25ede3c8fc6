pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cloud rejected the account credentials")]
    Unauthorized,
    #[error("http transport error")]
    Http(#[from] reqwest_middleware::Error),
    #[error("error decoding cloud payload")]
    Payload(#[from] reqwest::Error),
    #[error("cloud api error {status}: {message}")]
    Api { status: u16, message: String },
}

impl Error {
    /// Authentication failures get their own recovery path (reauth), so they
    /// must never be folded into the generic variants.
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Unauthorized)
    }
}
