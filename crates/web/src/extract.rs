//! Building a handler's typed input from the request.
//!
//! Which part of the request feeds the input depends on the method:
//!
//! - methods with body semantics (POST, PUT, PATCH, ...) decode the body as JSON
//! - the others (GET, HEAD, DELETE, OPTIONS, CONNECT) decode the query parameters merged with the
//!   path parameters, path parameters winning on conflict
//!
//! Parameters are strings on the wire, so they go through `serde_urlencoded`, which parses numbers
//! and booleans out of them. A failure names the offending field where it can be recovered.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_path_to_error::Segment;

use crate::error::DecodeError;
use crate::request::RequestContext;

const BODY_FIELD: &str = "body";
const QUERY_FIELD: &str = "query";

/// Decodes the handler input of type `I` from `req`.
pub fn decode_input<I: DeserializeOwned>(req: &RequestContext) -> Result<I, DecodeError> {
    if req.need_body() { decode_body(req.body()) } else { decode_params(req) }
}

/// Decodes a JSON body, reporting the path of the field that failed.
pub fn decode_body<I: DeserializeOwned>(body: Option<&Bytes>) -> Result<I, DecodeError> {
    let body = match body {
        Some(body) if !body.is_empty() => body,
        _ => return Err(DecodeError::new(BODY_FIELD, "missing request body")),
    };

    let mut deserializer = serde_json::Deserializer::from_slice(body);
    let input = serde_path_to_error::deserialize(&mut deserializer).map_err(json_decode_error)?;
    deserializer.end().map_err(|e| DecodeError::new(BODY_FIELD, without_position(&e.to_string())))?;
    Ok(input)
}

fn json_decode_error(error: serde_path_to_error::Error<serde_json::Error>) -> DecodeError {
    let root_shape = is_root_element(error.path());
    let path = error.path().to_string();
    let inner = error.into_inner();
    let message = inner.to_string();

    if let Some(field) = missing_field(&message) {
        return DecodeError::missing(if path == "." { field.to_owned() } else { format!("{path}.{field}") });
    }

    let field =
        if inner.is_syntax() || inner.is_eof() || root_shape || path == "." { BODY_FIELD.to_owned() } else { path };
    DecodeError::new(field, without_position(&message))
}

/// True when the failure sits on an element of a top-level array, i.e. the body as a whole has
/// the wrong shape for the input
fn is_root_element(path: &serde_path_to_error::Path) -> bool {
    let mut segments = path.iter();
    matches!((segments.next(), segments.next()), (Some(Segment::Seq { .. }), None))
}

/// Decodes query and path parameters through `serde_urlencoded`.
pub fn decode_params<I: DeserializeOwned>(req: &RequestContext) -> Result<I, DecodeError> {
    let mut params = req.query_params().clone();
    params.extend_from(req.path_params());

    let pairs = params.iter().collect::<Vec<_>>();
    let encoded = serde_urlencoded::to_string(pairs).map_err(|e| DecodeError::new(QUERY_FIELD, e.to_string()))?;

    serde_urlencoded::from_str(&encoded).map_err(|e| {
        let message = e.to_string();
        match missing_field(&message) {
            Some(field) => DecodeError::missing(field),
            None => DecodeError::new(QUERY_FIELD, message),
        }
    })
}

/// Extracts `x` from serde's "missing field `x`" message
fn missing_field(message: &str) -> Option<&str> {
    let rest = message.strip_prefix("missing field `")?;
    rest.split_once('`').map(|(field, _)| field)
}

/// Drops the " at line L column C" suffix serde_json appends
fn without_position(message: &str) -> String {
    match message.rfind(" at line ") {
        Some(index) => message[..index].to_owned(),
        None => message.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use http::{Method, Request};
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Named {
        name: String,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Nested {
        user: Named,
        age: u8,
    }

    fn post(body: &'static str) -> RequestContext {
        let header = Request::builder().method(Method::POST).uri("/").body(()).unwrap().into();
        RequestContext::with_body(header, Some(Bytes::from_static(body.as_bytes())))
    }

    fn get(uri: &str) -> RequestContext {
        RequestContext::new(Request::builder().method(Method::GET).uri(uri).body(()).unwrap().into())
    }

    #[test]
    fn decodes_json_body() {
        let input: Named = decode_input(&post(r#"{"name":"ann"}"#)).unwrap();
        assert_eq!(input, Named { name: "ann".to_owned() });
    }

    #[test]
    fn missing_body() {
        let header = Request::builder().method(Method::PUT).uri("/").body(()).unwrap().into();
        let error = decode_input::<Named>(&RequestContext::new(header)).unwrap_err();
        assert_eq!(error, DecodeError::new("body", "missing request body"));

        let error = decode_input::<Named>(&post("")).unwrap_err();
        assert_eq!(error.field(), "body");
    }

    #[test]
    fn missing_field_is_named() {
        let error = decode_input::<Named>(&post("{}")).unwrap_err();
        assert_eq!(error, DecodeError::missing("name"));
    }

    #[test]
    fn nested_missing_field_has_path() {
        let error = decode_input::<Nested>(&post(r#"{"user":{},"age":3}"#)).unwrap_err();
        assert_eq!(error, DecodeError::missing("user.name"));
    }

    #[test]
    fn wrong_type_names_field() {
        let error = decode_input::<Named>(&post(r#"{"name":42}"#)).unwrap_err();
        assert_eq!(error.field(), "name");
        assert_eq!(error.reason(), "invalid type: integer `42`, expected a string");

        let error = decode_input::<Nested>(&post(r#"{"user":{"name":"a"},"age":300}"#)).unwrap_err();
        assert_eq!(error.field(), "age");
    }

    #[test]
    fn malformed_json_reports_body() {
        let error = decode_input::<Named>(&post(r#"{"name":"#)).unwrap_err();
        assert_eq!(error.field(), "body");
        assert!(!error.reason().contains("line"));

        let error = decode_input::<Named>(&post(r#"{"name":"a"} trailing"#)).unwrap_err();
        assert_eq!(error.field(), "body");

        let error = decode_input::<Named>(&post("[1]")).unwrap_err();
        assert_eq!(error.field(), "body");
    }

    #[test]
    fn array_body_for_object_input_reports_body() {
        let error = decode_input::<Named>(&post("[true]")).unwrap_err();
        assert_eq!(error.field(), "body");

        let error = decode_input::<Nested>(&post(r#"[{"name":"a"},"old"]"#)).unwrap_err();
        assert_eq!(error.field(), "body");
    }

    #[test]
    fn field_inside_array_input_keeps_its_path() {
        let error = decode_input::<Vec<Named>>(&post(r#"[{"name":7}]"#)).unwrap_err();
        assert_eq!(error.field(), "[0].name");

        let input: Vec<Named> = decode_input(&post(r#"[{"name":"a"}]"#)).unwrap();
        assert_eq!(input, vec![Named { name: "a".to_owned() }]);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Lookup {
        id: u32,
        x: Option<String>,
    }

    #[test]
    fn decodes_params_without_body_semantics() {
        let mut req = get("/items/7?x=1");
        req.query_params_mut().insert("x", "1");
        req.query_params_mut().insert("id", "from-query");
        req.path_params_mut().insert("id", "7");

        let input: Lookup = decode_input(&req).unwrap();
        assert_eq!(input, Lookup { id: 7, x: Some("1".to_owned()) });
    }

    #[test]
    fn params_report_missing_and_invalid() {
        let error = decode_input::<Lookup>(&get("/items")).unwrap_err();
        assert_eq!(error, DecodeError::missing("id"));

        let mut req = get("/items/abc");
        req.path_params_mut().insert("id", "abc");
        let error = decode_input::<Lookup>(&req).unwrap_err();
        assert_eq!(error.field(), "query");
    }

    #[test]
    fn body_is_ignored_without_body_semantics() {
        let header = Request::builder().method(Method::DELETE).uri("/").body(()).unwrap().into();
        let mut req = RequestContext::with_body(header, Some(Bytes::from_static(br#"{"id":1}"#)));
        req.query_params_mut().insert("id", "2");

        let input: Lookup = decode_input(&req).unwrap();
        assert_eq!(input.id, 2);
    }

    #[test]
    fn strips_position_suffix() {
        assert_eq!(without_position("expected value at line 1 column 2"), "expected value");
        assert_eq!(without_position("plain"), "plain");
        assert_eq!(missing_field("missing field `msg` at line 1 column 2"), Some("msg"));
        assert_eq!(missing_field("unknown variant"), None);
    }
}
