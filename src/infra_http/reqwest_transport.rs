use crate::domain_model::*;
use crate::domain_port::{HttpTransport, TransportError};
use crate::logger::*;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use std::time::Duration;

pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// `timeout` bounds every call, refresh exchange included.
    pub fn try_new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn transport_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_builder() {
        TransportError::InvalidRequest(err.to_string())
    } else {
        TransportError::Network(err.to_string())
    }
}

fn multipart_form(form: &MultipartForm) -> Result<Form, TransportError> {
    let mut out = Form::new();
    for part in &form.parts {
        let mut p = Part::bytes(part.bytes.to_vec());
        if let Some(file_name) = &part.file_name {
            p = p.file_name(file_name.clone());
        }
        if let Some(content_type) = &part.content_type {
            p = p
                .mime_str(content_type)
                .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        }
        out = out.part(part.name.clone(), p);
    }
    Ok(out)
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&AccessToken>,
    ) -> Result<ApiResponse, TransportError> {
        let mut builder = self
            .client
            .request(method(request.method), self.url(&request.path));
        if let Some(token) = bearer {
            builder = builder.header(AUTHORIZATION, token.bearer());
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Encoded(text) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(text.clone()),
            RequestBody::Multipart(form) => builder.multipart(multipart_form(form)?),
        };

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(transport_error)?;
        trace!(%request, status, "response received");
        Ok(ApiResponse::new(status, body))
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
