use std::fmt::Write;

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Value};
use snafu::prelude::*;

use crate::common::{
    AuthenticationHeader, DecodeSnafu, RemoteOperationSnafu, ResponseSnafu, Result, NAMESPACE,
};

const ENVELOPE_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";

fn push_element(xml: &mut String, name: &str, value: &str) {
    let _ = write!(xml, "<{name}>{}</{name}>", escape(value));
}

/// Builds a SOAP 1.1 request carrying the authentication header.
pub(crate) fn build_request(
    auth: &AuthenticationHeader<'_>,
    operation: &str,
    params: &[(&str, String)],
) -> String {
    let mut xml = String::with_capacity(512);
    xml.push_str(r#"<?xml version="1.0" encoding="utf-8"?>"#);
    let _ = write!(xml, r#"<soap:Envelope xmlns:soap="{ENVELOPE_NAMESPACE}">"#);

    xml.push_str("<soap:Header>");
    let _ = write!(
        xml,
        r#"<AuthenticationHeader xmlns="{NAMESPACE}" soap:mustUnderstand="1">"#
    );
    push_element(&mut xml, "username", auth.username);
    push_element(&mut xml, "password", auth.password);
    push_element(&mut xml, "organizationname", auth.organization);
    if let Some(workspace) = auth.workspace {
        push_element(&mut xml, "workspacename", workspace);
    }
    xml.push_str("</AuthenticationHeader>");
    xml.push_str("</soap:Header>");

    xml.push_str("<soap:Body>");
    let _ = write!(xml, r#"<{operation} xmlns="{NAMESPACE}">"#);
    for (name, value) in params {
        push_element(&mut xml, name, value);
    }
    let _ = write!(xml, "</{operation}>");
    xml.push_str("</soap:Body>");

    xml.push_str("</soap:Envelope>");
    xml
}

#[derive(Default)]
struct Frame {
    name: String,
    children: Map<String, Value>,
    text: String,
}

impl Frame {
    fn into_value(self) -> Value {
        if !self.children.is_empty() {
            Value::Object(self.children)
        } else if !self.text.is_empty() {
            Value::String(self.text)
        } else {
            Value::Null
        }
    }
}

/// Repeated sibling names turn into a sequence.
fn insert_child(children: &mut Map<String, Value>, name: String, value: Value) {
    match children.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            children.insert(name, value);
        }
    }
}

/// Converts an XML document into a nested tree keyed by local element names.
///
/// Attributes are ignored. Elements with only text become strings, empty
/// elements become null.
pub(crate) fn parse_document(xml: &str) -> std::result::Result<Value, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack = vec![Frame::default()];
    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(Frame {
                name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
                ..Default::default()
            }),
            Event::Empty(start) => {
                let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                if let Some(parent) = stack.last_mut() {
                    insert_child(&mut parent.children, name, Value::Null);
                }
            }
            Event::Text(text) => {
                let text = text.unescape()?;
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(_) => {
                if stack.len() < 2 {
                    break;
                }
                if let Some(frame) = stack.pop() {
                    let name = frame.name.clone();
                    let value = frame.into_value();
                    if let Some(parent) = stack.last_mut() {
                        insert_child(&mut parent.children, name, value);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(Value::Object(
        stack.into_iter().next().unwrap_or_default().children,
    ))
}

fn render_detail(detail: Option<&Value>) -> String {
    match detail {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Extracts the `{operation}Response` element from a reply envelope.
///
/// SOAP faults become [`crate::common::Error::RemoteOperationError`].
pub(crate) fn parse_response(operation: &str, xml: &str) -> Result<Value> {
    let document = parse_document(xml)
        .boxed_local()
        .context(DecodeSnafu {
            operation,
            message: "Malformed SOAP response",
        })?;

    let body = document
        .get("Envelope")
        .and_then(|envelope| envelope.get("Body"))
        .context(ResponseSnafu {
            message: format!("{operation} response has no SOAP body"),
        })?;

    if let Some(fault) = body.get("Fault") {
        return RemoteOperationSnafu {
            operation,
            fault: render_detail(fault.get("faultstring")),
            detail: render_detail(fault.get("detail")),
        }
        .fail();
    }

    Ok(body
        .get(format!("{operation}Response"))
        .cloned()
        .unwrap_or(Value::Null))
}
