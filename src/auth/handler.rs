use axum::http::StatusCode;

impl From<&super::Error> for StatusCode {
    fn from(e: &super::Error) -> Self {
        match e {
            super::Error::Unauthorized => Self::UNAUTHORIZED,
            super::Error::Unavailable(_) => Self::SERVICE_UNAVAILABLE,
            super::Error::_User(_) => Self::INTERNAL_SERVER_ERROR,
        }
    }
}
