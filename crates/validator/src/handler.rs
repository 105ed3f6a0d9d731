//! Handler traits.
//!
//! - [`RequestHandler`] is what the host framework mounts and invokes per request.
//! - [`ArgumentHandler`] is a handler that expects already validated [`Arguments`]; it is what
//!   a [`ParameterValidator`](crate::ParameterValidator) decorates.
//! - [`FnHandler`] adapts a plain async fn whose parameters implement [`FromValidated`].

use crate::body::ResponseBody;
use crate::error::ExtractError;
use crate::fn_trait::FnTrait;
use crate::request::{PathParams, RequestContext};
use crate::responder::Responder;
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, Response, Uri};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::error::Error;
use std::marker::PhantomData;

pub type BoxError = Box<dyn Error + Send + Sync>;

#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, req: &RequestContext<'_>) -> Result<Response<ResponseBody>, BoxError>;
}

#[async_trait]
pub trait ArgumentHandler: Send + Sync {
    async fn call(&self, req: &RequestContext<'_>, args: Arguments) -> Result<Response<ResponseBody>, BoxError>;
}

/// Coerced parameter values, keyed by parameter name, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Vec<(String, Value)>,
}

impl Arguments {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self { values: Vec::with_capacity(capacity) }
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: Value) {
        self.values.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Deserializes one argument into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, ExtractError> {
        let value = self.get(name).ok_or_else(|| ExtractError::unknown_argument(name))?;
        Ok(T::deserialize(value)?)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// All arguments as one JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(self.values.iter().cloned().collect::<Map<_, _>>())
    }
}

/// Binds every validated argument, by name, to the fields of `T`.
///
/// # Example
/// ```
/// # use serde::Deserialize;
/// # use micro_validator::Valid;
/// #[derive(Deserialize)]
/// struct GreaterThan {
///     user_id: i64,
/// }
///
/// async fn greater_than(Valid(args): Valid<GreaterThan>) -> String {
///     format!("user_id: {}", args.user_id)
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Valid<T>(pub T);

/// Handler parameters that can be produced from a request and its validated arguments.
pub trait FromValidated: Sized + Send {
    fn from_validated(req: &RequestContext, args: &Arguments) -> Result<Self, ExtractError>;
}

impl<T> FromValidated for Valid<T>
where
    T: DeserializeOwned + Send,
{
    fn from_validated(_req: &RequestContext, args: &Arguments) -> Result<Self, ExtractError> {
        Ok(Valid(serde_json::from_value(args.to_json())?))
    }
}

impl FromValidated for Arguments {
    fn from_validated(_req: &RequestContext, args: &Arguments) -> Result<Self, ExtractError> {
        Ok(args.clone())
    }
}

impl FromValidated for Method {
    fn from_validated(req: &RequestContext, _args: &Arguments) -> Result<Self, ExtractError> {
        Ok(req.method().clone())
    }
}

impl FromValidated for Uri {
    fn from_validated(req: &RequestContext, _args: &Arguments) -> Result<Self, ExtractError> {
        Ok(req.uri().clone())
    }
}

impl FromValidated for HeaderMap {
    fn from_validated(req: &RequestContext, _args: &Arguments) -> Result<Self, ExtractError> {
        Ok(req.headers().clone())
    }
}

impl FromValidated for PathParams {
    fn from_validated(req: &RequestContext, _args: &Arguments) -> Result<Self, ExtractError> {
        Ok(req.path_params().clone())
    }
}

impl FromValidated for Bytes {
    fn from_validated(req: &RequestContext, _args: &Arguments) -> Result<Self, ExtractError> {
        Ok(req.body().clone())
    }
}

macro_rules! impl_from_validated_for_tuple {
    ($($param:ident)*) => {
        impl<$($param,)*> FromValidated for ($($param,)*)
        where
            $($param: FromValidated,)*
        {
            #[allow(unused_variables, reason = "the empty tuple ignores its inputs")]
            fn from_validated(req: &RequestContext, args: &Arguments) -> Result<Self, ExtractError> {
                Ok(($($param::from_validated(req, args)?,)*))
            }
        }
    };
}

impl_from_validated_for_tuple! {}
impl_from_validated_for_tuple! { A }
impl_from_validated_for_tuple! { A B }
impl_from_validated_for_tuple! { A B C }
impl_from_validated_for_tuple! { A B C D }
impl_from_validated_for_tuple! { A B C D E }
impl_from_validated_for_tuple! { A B C D E F }
impl_from_validated_for_tuple! { A B C D E F G }
impl_from_validated_for_tuple! { A B C D E F G H }
impl_from_validated_for_tuple! { A B C D E F G H I }
impl_from_validated_for_tuple! { A B C D E F G H I J }
impl_from_validated_for_tuple! { A B C D E F G H I J K }
impl_from_validated_for_tuple! { A B C D E F G H I J K L }

/// a `FnTrait` holder which represents any async Fn
pub struct FnHandler<F, Args> {
    f: F,
    _phantom: PhantomData<fn(Args)>,
}

impl<F, Args> FnHandler<F, Args>
where
    F: FnTrait<Args>,
{
    fn new(f: F) -> Self {
        Self { f, _phantom: PhantomData }
    }
}

pub fn handler_fn<F, Args>(f: F) -> FnHandler<F, Args>
where
    F: FnTrait<Args>,
{
    FnHandler::new(f)
}

#[async_trait]
impl<F, Args> ArgumentHandler for FnHandler<F, Args>
where
    F: FnTrait<Args>,
    F::Output: Responder,
    Args: FromValidated,
{
    async fn call(&self, req: &RequestContext<'_>, args: Arguments) -> Result<Response<ResponseBody>, BoxError> {
        let args = Args::from_validated(req, &args)?;
        let responder = self.f.call(args).await;
        Ok(responder.response_to(req))
    }
}
