//! Request extractors that turn axum rejections into the JSON error body used
//! across the API instead of axum's plain-text defaults.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Json, Path, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::core::shared::error::ApiError;
use crate::security::validation::{missing_required_fields, FieldError, Validate};

/// JSON body that has passed the required-field check, serde decoding and
/// `Validate::validate`, in that order. Nothing downstream runs otherwise.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<serde_json::Value>::from_request(req, state)
            .await
            .map_err(|rejection| {
                ApiError::Validation(vec![FieldError::new("body", rejection.body_text())])
            })?;

        decode_validated(body).map(Self)
    }
}

/// Body of an action route (`/:id/pay`, `/:id/resolve`, ...). An empty body
/// stands for `{}`; anything else goes through the same checks as
/// [`ValidatedJson`].
#[derive(Debug, Clone)]
pub struct ActionBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ActionBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

        let body = if bytes.iter().all(u8::is_ascii_whitespace) {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_slice(&bytes).map_err(|e| {
                ApiError::Validation(vec![FieldError::new("body", e.to_string())])
            })?
        };
        decode_validated(body).map(Self)
    }
}

fn decode_validated<T>(body: serde_json::Value) -> Result<T, ApiError>
where
    T: DeserializeOwned + Validate,
{
    if !body.is_object() {
        return Err(ApiError::Validation(vec![FieldError::new(
            "body",
            "Expected a JSON object",
        )]));
    }

    let missing = missing_required_fields(&body, T::REQUIRED);
    if !missing.is_empty() {
        return Err(ApiError::Validation(missing));
    }

    let value: T = serde_json::from_value(body).map_err(|e| {
        ApiError::Validation(vec![FieldError::new(serde_error_field(&e), e.to_string())])
    })?;

    value.validate()?;
    Ok(value)
}

fn serde_error_field(err: &serde_json::Error) -> String {
    let message = err.to_string();
    message
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split('`').next())
        .map(str::to_string)
        .unwrap_or_else(|| "body".to_string())
}

/// Query-string filters; a malformed value is a 400 with a JSON body.
#[derive(Debug, Clone)]
pub struct FilterQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for FilterQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Path parameter (usually the `:id` UUID) with JSON rejection.
#[derive(Debug, Clone)]
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::validation::{ValidationResult, Validator};
    use axum::body::Body;
    use axum::http::{header, Request as HttpRequest};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Probe {
        name: String,
        vendor_name: String,
        #[serde(default)]
        note: Option<String>,
    }

    impl Validate for Probe {
        const REQUIRED: &'static [&'static str] = &["name", "vendorName"];

        fn validate(&self) -> Result<(), ValidationResult> {
            Validator::new()
                .text(&self.name, "name", 8)
                .text(&self.vendor_name, "vendorName", 40)
                .opt(self.note.as_deref(), |v, note| v.length(note, "note", None, Some(4)))
                .validate()
        }
    }

    fn json_request(body: &str) -> Request {
        HttpRequest::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn extract(body: &str) -> Result<ValidatedJson<Probe>, ApiError> {
        ValidatedJson::<Probe>::from_request(json_request(body), &()).await
    }

    fn details(err: ApiError) -> Vec<FieldError> {
        match err {
            ApiError::Validation(details) => details,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_all_missing_fields_are_reported() {
        let err = extract("{}").await.unwrap_err();
        let fields: Vec<_> = details(err).into_iter().map(|d| d.field).collect();
        assert_eq!(fields, vec!["name", "vendorName"]);
    }

    #[tokio::test]
    async fn test_malformed_json_is_validation_error() {
        let err = extract("{\"name\": ").await.unwrap_err();
        assert_eq!(details(err)[0].field, "body");
    }

    #[tokio::test]
    async fn test_type_mismatch_is_validation_error() {
        let err = extract(r#"{"name": 5, "vendorName": "IEC"}"#).await.unwrap_err();
        assert!(!details(err).is_empty());
    }

    #[tokio::test]
    async fn test_validate_runs_after_decode() {
        let err = extract(r#"{"name": "far too long a name", "vendorName": "IEC", "note": "toolong"}"#)
            .await
            .unwrap_err();
        let fields: Vec<_> = details(err).into_iter().map(|d| d.field).collect();
        assert_eq!(fields, vec!["name", "note"]);
    }

    #[tokio::test]
    async fn test_valid_body_passes() {
        let ValidatedJson(probe) = extract(r#"{"name": "TLV-01", "vendorName": "IEC"}"#)
            .await
            .unwrap();
        assert_eq!(probe.name, "TLV-01");
        assert!(probe.note.is_none());
    }

    #[tokio::test]
    async fn test_action_body_accepts_empty_and_rejects_bad_json() {
        #[derive(Debug, Default, Deserialize)]
        struct Notes {
            #[serde(default)]
            notes: Option<String>,
        }
        impl Validate for Notes {
            fn validate(&self) -> Result<(), ValidationResult> {
                Ok(())
            }
        }

        let empty = HttpRequest::builder()
            .method("POST")
            .uri("/")
            .body(Body::empty())
            .unwrap();
        let ActionBody(notes) = ActionBody::<Notes>::from_request(empty, &()).await.unwrap();
        assert!(notes.notes.is_none());

        let ActionBody(notes) =
            ActionBody::<Notes>::from_request(json_request(r#"{"notes": "fixed"}"#), &())
                .await
                .unwrap();
        assert_eq!(notes.notes.as_deref(), Some("fixed"));

        let err = ActionBody::<Notes>::from_request(json_request("[1,"), &())
            .await
            .unwrap_err();
        assert_eq!(details(err)[0].field, "body");
    }

    #[test]
    fn test_serde_error_field_extracts_missing_field() {
        let err = serde_json::from_str::<Probe>(r#"{"name": "x"}"#).unwrap_err();
        assert_eq!(serde_error_field(&err), "vendorName");
    }
}
