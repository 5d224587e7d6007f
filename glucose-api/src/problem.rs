//! The problems that can occur when using this API.
//! Implements RFC7807.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt::{self, Display};
use validator::{ValidationErrors, ValidationErrorsKind};

pub type AppResult<T> = Result<T, Problem>;

pub const NOT_FOUND: Problem = Problem::Generic(GenericProblem::NotFound);
pub const BAD_REQUEST: Problem = Problem::Generic(GenericProblem::BadRequest);
pub const UNSUPPORTED_MEDIA_TYPE: Problem = Problem::Generic(GenericProblem::UnsupportedMediaType);
pub const INTERNAL_SERVER_ERROR: Problem = Problem::Generic(GenericProblem::InternalServerError);

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum Problem {
    #[serde(rename = "about:blank")]
    Generic(GenericProblem),

    #[serde(rename = "/probs/invalid-json")]
    InvalidJson,

    #[serde(rename = "/probs/invalid-parameters")]
    InvalidParameters {
        invalid_parameters: InvalidParameters,
    },
}

impl Problem {
    pub fn to_status_code(&self) -> StatusCode {
        use GenericProblem::*;
        use Problem::*;

        match self {
            Generic(NotFound) => StatusCode::NOT_FOUND,
            Generic(BadRequest) => StatusCode::BAD_REQUEST,
            Generic(UnsupportedMediaType) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Generic(InternalServerError) => StatusCode::INTERNAL_SERVER_ERROR,
            InvalidJson => StatusCode::BAD_REQUEST,
            Problem::InvalidParameters { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let descriptive_problem: DescriptiveProblem = self.into();
        write!(f, "{:?}", descriptive_problem)
    }
}

impl StdError for Problem {}

impl IntoResponse for Problem {
    fn into_response(self) -> axum::response::Response {
        let descriptive_problem = DescriptiveProblem::from(&self);
        let mut response = axum::Json(descriptive_problem).into_response();
        *response.status_mut() = self.to_status_code();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        response
    }
}

impl From<diesel::result::Error> for Problem {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => NOT_FOUND,
            err => {
                tracing::error!("Database query failed: {}", err);
                INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<deadpool_diesel::PoolError> for Problem {
    fn from(err: deadpool_diesel::PoolError) -> Self {
        tracing::error!("Could not get a database connection: {}", err);
        INTERNAL_SERVER_ERROR
    }
}

impl From<deadpool_diesel::InteractError> for Problem {
    fn from(err: deadpool_diesel::InteractError) -> Self {
        tracing::error!("Database interaction was aborted: {}", err);
        INTERNAL_SERVER_ERROR
    }
}

impl From<ValidationErrors> for Problem {
    fn from(validation_errors: ValidationErrors) -> Self {
        Problem::InvalidParameters {
            invalid_parameters: InvalidParameters::from(validation_errors),
        }
    }
}

#[derive(Debug, Serialize)]
// Note: this attribute is a bit hacky, as DescriptiveProblem also defines a title field. But it
// works as expected (i.e., when Serde serializes a DescriptiveProblem with its title field set to
// None and with its problem field to the Problem::Generic variant, the title field in the generated
// serialization is taken from the GenericProblem variant).
#[serde(tag = "title")]
pub enum GenericProblem {
    #[serde(rename = "Not Found")]
    NotFound,

    #[serde(rename = "Bad Request")]
    BadRequest,

    #[serde(rename = "Unsupported Media Type")]
    UnsupportedMediaType,

    #[serde(rename = "Internal Server Error")]
    InternalServerError,
}

#[derive(Debug, Serialize)]
pub struct DescriptiveProblem<'a> {
    #[serde(flatten)]
    pub problem: &'a Problem,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl<'a> From<&'a Problem> for DescriptiveProblem<'a> {
    fn from(problem: &'a Problem) -> DescriptiveProblem<'a> {
        use Problem::*;

        let status = Some(problem.to_status_code().as_u16());

        let (title, detail) = match problem {
            Generic(_) => (None, None),

            InvalidJson => (
                Some("Your request JSON was malformed.".to_owned()),
                Some("The JSON might be syntactically incorrect, or it might not adhere to the endpoint's schema.".to_owned()),
            ),

            Problem::InvalidParameters { .. } => (
                Some("Your request parameters did not validate.".to_owned()),
                None,
            ),
        };

        DescriptiveProblem {
            problem,
            title,
            status,
            detail,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidParameterReason {
    Required,
    MustHaveLengthBetween {
        min: Option<u64>,
        max: Option<u64>,
    },
    MustNotBeInFuture,
    MustBeDateOrDateTime,
    Other(String),
}

/// Invalid parameters, keyed by parameter name.
#[derive(Debug, Default, Serialize)]
#[serde(transparent)]
pub struct InvalidParameters {
    parameters: BTreeMap<String, Vec<InvalidParameterReason>>,
}

impl InvalidParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, reason: InvalidParameterReason) {
        self.parameters
            .entry(name.to_owned())
            .or_default()
            .push(reason);
    }

    pub fn reasons(&self, name: &str) -> &[InvalidParameterReason] {
        self.parameters
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl From<InvalidParameters> for Problem {
    fn from(invalid_parameters: InvalidParameters) -> Self {
        Problem::InvalidParameters { invalid_parameters }
    }
}

impl From<ValidationErrors> for InvalidParameters {
    fn from(validation_errors: ValidationErrors) -> Self {
        let mut invalid_parameters = InvalidParameters::new();

        for (field, kind) in validation_errors.errors() {
            let errors = match kind {
                ValidationErrorsKind::Field(errors) => errors,
                // Only flat request structs are validated.
                _ => continue,
            };

            for error in errors {
                let reason = match &*error.code {
                    "required" => InvalidParameterReason::Required,
                    "length" => InvalidParameterReason::MustHaveLengthBetween {
                        min: error.params.get("min").and_then(|v| v.as_u64()),
                        max: error.params.get("max").and_then(|v| v.as_u64()),
                    },
                    "not_in_future" => InvalidParameterReason::MustNotBeInFuture,
                    code => InvalidParameterReason::Other(code.to_owned()),
                };
                invalid_parameters.add(field, reason);
            }
        }

        invalid_parameters
    }
}
