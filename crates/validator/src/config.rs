use http::StatusCode;

/// Documentation base URL echoed in every error's `url`, followed by the error code.
pub const DEFAULT_ERRORS_URL: &str = "https://errors.pydantic.dev/2.1.2/v/";

/// Settings shared by every request a [`ParameterValidator`](crate::ParameterValidator) handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    errors_url: Option<String>,
    rejection_status: StatusCode,
}

impl ValidatorConfig {
    pub fn builder() -> ValidatorConfigBuilder {
        ValidatorConfigBuilder::new()
    }

    pub fn errors_url(&self) -> Option<&str> {
        self.errors_url.as_deref()
    }

    pub fn rejection_status(&self) -> StatusCode {
        self.rejection_status
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug)]
pub struct ValidatorConfigBuilder {
    errors_url: Option<String>,
    rejection_status: StatusCode,
}

impl ValidatorConfigBuilder {
    fn new() -> Self {
        Self { errors_url: Some(DEFAULT_ERRORS_URL.to_owned()), rejection_status: StatusCode::UNPROCESSABLE_ENTITY }
    }

    pub fn errors_url(mut self, base: impl Into<String>) -> Self {
        self.errors_url = Some(base.into());
        self
    }

    /// Leaves `url` out of the error objects.
    pub fn without_errors_url(mut self) -> Self {
        self.errors_url = None;
        self
    }

    pub fn rejection_status(mut self, status: StatusCode) -> Self {
        self.rejection_status = status;
        self
    }

    pub fn build(self) -> ValidatorConfig {
        ValidatorConfig { errors_url: self.errors_url, rejection_status: self.rejection_status }
    }
}
