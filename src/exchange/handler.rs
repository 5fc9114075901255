use axum::http::StatusCode;

impl From<&super::Error> for StatusCode {
    fn from(e: &super::Error) -> Self {
        match e {
            super::Error::AlreadyConfirmed(_) => Self::CONFLICT,
            super::Error::LedgerUnavailable(_) => Self::SERVICE_UNAVAILABLE,
            super::Error::_R2d2(_) | super::Error::_Diesel(_) => Self::INTERNAL_SERVER_ERROR,
        }
    }
}
