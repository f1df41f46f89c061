//! Request body encoders and response body decoders.
//!
//! Generated stubs convert the body argument to a [`serde_json::Value`] first, so
//! encoders are object-safe and can be chosen at registration time per contract.

use std::sync::Arc;

use serde_json::Value;

use crate::error::{EncodeError, EncoderInstantiationError};
use crate::request::RequestTemplate;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

/// Writes a request body (and its content type) into the request template.
pub trait Encoder: Send + Sync {
    /// # Errors
    /// [`EncodeError`] if the body cannot be represented by this encoder.
    fn encode(&self, body: &Value, request: &mut RequestTemplate) -> Result<(), EncodeError>;

    fn name(&self) -> &'static str;
}

/// Zero-argument construction of an encoder type referenced from a contract.
pub trait NewEncoder: Encoder + Sized + 'static {
    /// # Errors
    /// [`EncoderInstantiationError`] if the encoder cannot be built.
    fn new_encoder() -> Result<Self, EncoderInstantiationError>;
}

/// Type-erased constructor used by [`crate::declaration::EncoderRef`].
///
/// # Errors
/// Whatever `T::new_encoder` fails with.
pub fn instantiate_encoder<T: NewEncoder>() -> Result<Arc<dyn Encoder>, EncoderInstantiationError> {
    T::new_encoder().map(|e| Arc::new(e) as Arc<dyn Encoder>)
}

/// Default encoder: the body as a JSON document.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonEncoder;

impl Encoder for JsonEncoder {
    fn encode(&self, body: &Value, request: &mut RequestTemplate) -> Result<(), EncodeError> {
        let bytes = serde_json::to_vec(body)?;
        request.set_body(bytes, CONTENT_TYPE_JSON);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "JsonEncoder"
    }
}

impl NewEncoder for JsonEncoder {
    fn new_encoder() -> Result<Self, EncoderInstantiationError> {
        Ok(Self)
    }
}

/// `application/x-www-form-urlencoded` bodies from flat JSON objects.
#[derive(Debug, Default, Clone, Copy)]
pub struct FormEncoder;

impl Encoder for FormEncoder {
    fn encode(&self, body: &Value, request: &mut RequestTemplate) -> Result<(), EncodeError> {
        let Value::Object(map) = body else {
            return Err(EncodeError::Unsupported {
                encoder: self.name(),
                reason: "body must be an object".to_owned(),
            });
        };

        let mut pairs = Vec::with_capacity(map.len());
        for (key, value) in map {
            let text = match value {
                Value::Null => continue,
                Value::String(s) => s.clone(),
                Value::Bool(_) | Value::Number(_) => value.to_string(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(EncodeError::Unsupported {
                        encoder: self.name(),
                        reason: format!("field '{key}' is not a scalar"),
                    })
                }
            };
            pairs.push((key.as_str(), text));
        }

        let encoded = serde_urlencoded::to_string(&pairs)?;
        request.set_body(encoded.into_bytes(), CONTENT_TYPE_FORM);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "FormEncoder"
    }
}

impl NewEncoder for FormEncoder {
    fn new_encoder() -> Result<Self, EncoderInstantiationError> {
        Ok(Self)
    }
}

/// Turns a raw response body into a JSON value.
pub trait Decoder: Send + Sync {
    /// # Errors
    /// The parser error for bodies that are not valid JSON.
    fn decode(&self, body: &[u8]) -> Result<Value, serde_json::Error>;
}

/// Default decoder; an empty or whitespace-only body decodes to `null`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDecoder;

impl Decoder for JsonDecoder {
    fn decode(&self, body: &[u8]) -> Result<Value, serde_json::Error> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(body)
    }
}
