use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use erased_serde::Serialize as ErasedSerialize;
use std::collections::HashMap;

use crate::problem;

pub enum ResponseValue {
    Serializable(Box<dyn ErasedSerialize + Send>),
}

pub struct Response {
    value: Option<ResponseValue>,
    status_code: StatusCode,
    headers: HashMap<String, String>,
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        let mut response = match self.value {
            Some(ResponseValue::Serializable(value)) => match serde_json::to_vec(&value) {
                Ok(body) => (
                    [(
                        header::CONTENT_TYPE,
                        HeaderValue::from_static("application/json"),
                    )],
                    body,
                )
                    .into_response(),
                Err(err) => {
                    tracing::error!("Could not serialize response body: {}", err);
                    return problem::INTERNAL_SERVER_ERROR.into_response();
                }
            },
            None => ().into_response(),
        };

        *response.status_mut() = self.status_code;
        for (name, value) in self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    response.headers_mut().insert(name, value);
                }
                _ => tracing::warn!("Dropping invalid response header {}: {}", name, value),
            }
        }

        response
    }
}

pub struct ResponseBuilder {
    status_code: StatusCode,
    headers: HashMap<String, String>,
    links: Vec<String>,
}

impl ResponseBuilder {
    /// Create a new response builder with the given status code.
    pub fn new(status_code: StatusCode) -> Self {
        ResponseBuilder {
            status_code,
            headers: HashMap::new(),
            links: Vec::new(),
        }
    }

    fn process(&mut self) {
        if !self.links.is_empty() {
            let links = self.links.join(", ");
            self.headers.insert("link".to_owned(), links);
        }
    }

    /// Create a response with a 200 OK status code.
    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    /// Create a response with a 201 Created status code.
    pub fn created() -> Self {
        Self::new(StatusCode::CREATED)
    }

    /// Create a response with a 204 No Content status code.
    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT)
    }

    pub fn link(mut self, uri: &str, rel: &str) -> Self {
        self.links.push(format!("<{}>; rel=\"{}\"", uri, rel));
        self
    }

    /// Add a Location URI header. Only makes sense with the Created or a Redirection status.
    pub fn content_uri(mut self, uri: String) -> Self {
        self.headers.insert("location".to_owned(), uri);
        self
    }

    /// Build an empty response.
    pub fn empty(mut self) -> Response {
        self.process();
        Response {
            value: None,
            status_code: self.status_code,
            headers: self.headers,
        }
    }

    /// Build the response with the given serializable value.
    pub fn body<T>(mut self, value: T) -> Response
    where
        T: ErasedSerialize + Send + 'static,
    {
        self.process();
        Response {
            value: Some(ResponseValue::Serializable(
                Box::new(value) as Box<dyn ErasedSerialize + Send>
            )),
            status_code: self.status_code,
            headers: self.headers,
        }
    }
}
