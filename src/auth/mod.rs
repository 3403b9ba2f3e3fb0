use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use futures::future::{ready, Ready};

use crate::errors::ServiceError;

/// header set by the identity aware proxy in front of the api
pub const USER_HEADER: &str = "X-User-Id";

/// The external identity of the caller, as forwarded by the proxy.
/// Returns Unauthorized when the request carries no identity.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub external_user_id: String,
}

impl CurrentUser {
    fn from_headers(req: &HttpRequest) -> Result<CurrentUser, ServiceError> {
        let external_user_id = req
            .headers()
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(ServiceError::Unauthorized)?;

        Ok(CurrentUser {
            external_user_id: external_user_id.to_string(),
        })
    }
}

impl FromRequest for CurrentUser {
    type Error = ServiceError;
    type Future = Ready<Result<Self, Self::Error>>;
    type Config = ();

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(CurrentUser::from_headers(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn missing_identity_is_unauthorized() {
        let req = TestRequest::default().to_http_request();

        assert_eq!(
            CurrentUser::from_headers(&req).unwrap_err(),
            ServiceError::Unauthorized
        );
    }

    #[test]
    fn blank_identity_is_unauthorized() {
        let req = TestRequest::default()
            .header(USER_HEADER, "  ")
            .to_http_request();

        assert!(CurrentUser::from_headers(&req).is_err());
    }

    #[test]
    fn identity_from_header() {
        let req = TestRequest::default()
            .header(USER_HEADER, "auth0|1234")
            .to_http_request();

        let user = CurrentUser::from_headers(&req).unwrap();

        assert_eq!(user.external_user_id, "auth0|1234");
    }
}
