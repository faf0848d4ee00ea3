use axum::{async_trait, extract::{FromRequest, Request}, Json};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::Error;

/// JSON body that has passed its `validator` rules. Malformed bodies and
/// rule failures both come back as 422 in the standard envelope.
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await
            .map_err(|rejection| Error::Validation(rejection.body_text()))?;
        value.validate()?;
        Ok(ValidJson(value))
    }
}
