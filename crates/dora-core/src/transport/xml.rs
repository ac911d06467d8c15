//! XML bodies decoded into the same `serde_json::Value` shape as JSON ones.
//!
//! Conventions:
//! - the document root becomes a single-key map named after the root element
//! - attributes become `@name` keys
//! - text next to attributes or child elements becomes `#text`
//! - text-only elements become strings, empty elements become `null`
//! - repeated sibling elements become arrays

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

struct Frame {
    name: String,
    fields: Map<String, Value>,
    has_structure: bool,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self, String> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut fields = Map::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| e.to_string())?;
            let key = format!("@{}", String::from_utf8_lossy(attribute.key.as_ref()));
            let value = attribute.unescape_value().map_err(|e| e.to_string())?;
            fields.insert(key, Value::String(value.into_owned()));
        }
        let has_structure = !fields.is_empty();
        Ok(Frame {
            name,
            fields,
            has_structure,
            text: String::new(),
        })
    }

    fn add_child(&mut self, name: String, value: Value) {
        self.has_structure = true;
        match self.fields.remove(&name) {
            None => {
                self.fields.insert(name, value);
            }
            Some(Value::Array(mut items)) => {
                items.push(value);
                self.fields.insert(name, Value::Array(items));
            }
            Some(previous) => {
                self.fields.insert(name, Value::Array(vec![previous, value]));
            }
        }
    }

    fn close(mut self) -> (String, Value) {
        let text = self.text.trim().to_string();
        let value = if !self.has_structure {
            if text.is_empty() {
                Value::Null
            } else {
                Value::String(text)
            }
        } else {
            if !text.is_empty() {
                self.fields.insert("#text".to_string(), Value::String(text));
            }
            Value::Object(self.fields)
        };
        (self.name, value)
    }
}

/// Decode an XML document.
pub fn to_value(body: &str) -> Result<Value, String> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<Value> = None;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(start) => stack.push(Frame::open(&start)?),
            Event::Empty(start) => {
                let (name, value) = Frame::open(&start)?.close();
                attach(&mut stack, &mut root, name, value)?;
            }
            Event::Text(text) => {
                if let Some(frame) = stack.last_mut() {
                    let text = text.unescape().map_err(|e| e.to_string())?;
                    frame.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| "closing tag without opening tag".to_string())?;
                let (name, value) = frame.close();
                attach(&mut stack, &mut root, name, value)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err("unexpected end of document".to_string());
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

fn attach(
    stack: &mut [Frame],
    root: &mut Option<Value>,
    name: String,
    value: Value,
) -> Result<(), String> {
    match stack.last_mut() {
        Some(parent) => {
            parent.add_child(name, value);
            Ok(())
        }
        None if root.is_none() => {
            let mut map = Map::new();
            map.insert(name, value);
            *root = Some(Value::Object(map));
            Ok(())
        }
        None => Err("document has more than one root element".to_string()),
    }
}
