//! Request under construction, filled in by a generated method stub.

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::error::{ClientError, EncodeError};

#[derive(Debug, Clone)]
pub struct RequestTemplate {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    content_type: Option<String>,
}

impl RequestTemplate {
    /// `path` may contain `{name}` variables, filled by [`RequestTemplate::path_param`].
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            content_type: None,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn set_body(&mut self, body: Vec<u8>, content_type: &str) {
        self.body = Some(body);
        self.content_type = Some(content_type.to_owned());
    }

    /// Substitute `{name}` in the path with the percent-encoded value.
    ///
    /// Sequences are joined with commas; `None` becomes an empty segment.
    ///
    /// # Errors
    /// [`ClientError::Encode`] if the value does not serialize to a scalar or sequence.
    pub fn path_param<T: Serialize + ?Sized>(
        &mut self,
        name: &str,
        value: &T,
    ) -> Result<(), ClientError> {
        let segment = param_values(value)?
            .iter()
            .map(|v| urlencoding::encode(v))
            .collect::<Vec<_>>()
            .join(",");
        self.path = self.path.replace(&format!("{{{name}}}"), &segment);
        Ok(())
    }

    /// Append a query pair per value; `None` adds nothing, sequences repeat the name.
    ///
    /// # Errors
    /// [`ClientError::Encode`] for values that are not scalars or sequences of scalars.
    pub fn query<T: Serialize + ?Sized>(
        &mut self,
        name: &str,
        value: &T,
    ) -> Result<(), ClientError> {
        for v in param_values(value)? {
            self.query.push((name.to_owned(), v));
        }
        Ok(())
    }

    /// Set a header per value; `None` adds nothing.
    ///
    /// # Errors
    /// [`ClientError::Encode`] for values that are not scalars or sequences of scalars.
    pub fn header<T: Serialize + ?Sized>(
        &mut self,
        name: &str,
        value: &T,
    ) -> Result<(), ClientError> {
        for v in param_values(value)? {
            self.headers.push((name.to_owned(), v));
        }
        Ok(())
    }

    /// Absolute URL of this request against `base`.
    ///
    /// The template path is appended to the base path; query pairs are appended after
    /// any query already present in the base.
    ///
    /// # Errors
    /// [`ClientError::InvalidUrl`] if the combination does not parse.
    pub fn url(&self, base: &str) -> Result<Url, ClientError> {
        let invalid = |reason: String| ClientError::InvalidUrl {
            url: format!("{base}{}", self.path),
            reason,
        };
        let mut url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
        if url.cannot_be_a_base() {
            return Err(invalid("base URL cannot carry a path".to_owned()));
        }

        if !self.path.is_empty() {
            let joined = format!(
                "{}/{}",
                url.path().trim_end_matches('/'),
                self.path.trim_start_matches('/')
            );
            url.set_path(&joined);
        }
        if !self.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }
}

fn param_values<T: Serialize + ?Sized>(value: &T) -> Result<Vec<String>, EncodeError> {
    let scalar = |v: &Value| -> Result<Option<String>, EncodeError> {
        match v {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s.clone())),
            Value::Bool(_) | Value::Number(_) => Ok(Some(v.to_string())),
            Value::Array(_) | Value::Object(_) => Err(EncodeError::Unsupported {
                encoder: "RequestTemplate",
                reason: "parameter values must be scalars or sequences of scalars".to_owned(),
            }),
        }
    };

    match serde_json::to_value(value)? {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| scalar(item).transpose())
            .collect(),
        other => Ok(scalar(&other)?.into_iter().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_variables_are_encoded() {
        let mut req = RequestTemplate::new(Method::GET, "/orders/{id}/lines/{line}");
        req.path_param("id", &42u64).unwrap();
        req.path_param("line", "a b/c").unwrap();
        assert_eq!(req.path(), "/orders/42/lines/a%20b%2Fc");
    }

    #[test]
    fn query_skips_none_and_repeats_sequences() {
        let mut req = RequestTemplate::new(Method::GET, "/search");
        req.query("status", &Some("open")).unwrap();
        req.query("page", &None::<u32>).unwrap();
        req.query("tag", &vec!["a", "b"]).unwrap();
        assert_eq!(
            req.query_pairs(),
            &[
                ("status".to_owned(), "open".to_owned()),
                ("tag".to_owned(), "a".to_owned()),
                ("tag".to_owned(), "b".to_owned()),
            ]
        );
    }

    #[test]
    fn nested_values_are_rejected() {
        let mut req = RequestTemplate::new(Method::GET, "/x");
        let err = req.query("filter", &serde_json::json!({"a": 1})).unwrap_err();
        assert!(matches!(err, ClientError::Encode(_)));
    }

    #[test]
    fn url_joins_base_path_and_query() {
        let mut req = RequestTemplate::new(Method::GET, "/payments");
        req.query("q", "a&b").unwrap();
        assert_eq!(
            req.url("https://pay.internal/api").unwrap().as_str(),
            "https://pay.internal/api/payments?q=a%26b"
        );
        assert_eq!(
            req.url("https://pay.internal/api/").unwrap().as_str(),
            "https://pay.internal/api/payments?q=a%26b"
        );
    }

    #[test]
    fn sequence_path_values_keep_literal_commas() {
        let mut req = RequestTemplate::new(Method::GET, "/orders/{ids}");
        req.path_param("ids", &vec!["a,b", "c d"]).unwrap();
        assert_eq!(req.path(), "/orders/a%2Cb,c%20d");
    }

    #[test]
    fn base_query_is_kept_before_request_query() {
        let mut req = RequestTemplate::new(Method::GET, "/payments");
        req.query("status", "open").unwrap();
        assert_eq!(
            req.url("https://x.internal/api?tenant=a").unwrap().as_str(),
            "https://x.internal/api/payments?tenant=a&status=open"
        );

        let bare = RequestTemplate::new(Method::GET, "/payments");
        assert_eq!(
            bare.url("https://x.internal/api/?tenant=a").unwrap().as_str(),
            "https://x.internal/api/payments?tenant=a"
        );
        assert_eq!(
            bare.url("https://x.internal").unwrap().as_str(),
            "https://x.internal/payments"
        );
    }

    #[test]
    fn unparsable_base_is_invalid_url() {
        let req = RequestTemplate::new(Method::GET, "/x");
        assert!(matches!(
            req.url("not a url"),
            Err(ClientError::InvalidUrl { .. })
        ));
        assert!(matches!(
            req.url("mailto:ops@pay.internal"),
            Err(ClientError::InvalidUrl { .. })
        ));
    }
}
