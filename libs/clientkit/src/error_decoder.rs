//! Translation of non-success responses into [`ClientError`].

use crate::error::ClientError;

/// Maximum response body bytes carried in a status error.
pub const ERROR_BODY_PREVIEW_LIMIT: usize = 8 * 1024;

pub trait ErrorDecoder: Send + Sync {
    /// Called for every response whose status is not 2xx.
    fn decode(&self, method_key: &str, status: u16, body: &[u8]) -> ClientError;
}

/// Uniform status error carrying the code and the (truncated) body.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatusErrorDecoder;

impl ErrorDecoder for StatusErrorDecoder {
    fn decode(&self, method_key: &str, status: u16, body: &[u8]) -> ClientError {
        let cut = body.len().min(ERROR_BODY_PREVIEW_LIMIT);
        ClientError::Status {
            method_key: method_key.to_owned(),
            status,
            body: String::from_utf8_lossy(&body[..cut]).into_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carries_status_and_body() {
        let body = b"{\"error\":\"nope\"}";
        let err = StatusErrorDecoder.decode("PaymentClient#get_payment", 404, body);
        match err {
            ClientError::Status {
                method_key,
                status,
                body,
            } => {
                assert_eq!(method_key, "PaymentClient#get_payment");
                assert_eq!(status, 404);
                assert_eq!(body, "{\"error\":\"nope\"}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn body_is_capped() {
        let body = vec![b'x'; ERROR_BODY_PREVIEW_LIMIT * 2];
        let err = StatusErrorDecoder.decode("A#b", 500, &body);
        let ClientError::Status { body, .. } = err else {
            panic!("expected status error");
        };
        assert_eq!(body.len(), ERROR_BODY_PREVIEW_LIMIT);
    }
}
