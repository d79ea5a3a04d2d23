//! JSON rendering and parsing.
//!
//! Structs and unions become objects keyed by IDL field names, enums are
//! tag names, 64-bit integers are decimal strings (so they survive
//! JavaScript), opaque data is base64, an absent optional is `null` and
//! vectors and fixed arrays are arrays.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{de, ser, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

use crate::error::{XdrError, XdrResult};
use crate::value::{NumKind, XdrType, XdrValue, XdrVisitor};

enum OutFrame {
    Object(Map<String, Value>),
    Array(Vec<Value>),
    Slot(Option<Value>),
}

/// Visitor building a [`serde_json::Value`].
pub struct JsonOut {
    stack: Vec<OutFrame>,
}

impl Default for JsonOut {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonOut {
    pub fn new() -> Self {
        Self {
            stack: vec![OutFrame::Slot(None)],
        }
    }

    /// The rendered value; `null` if nothing was marshaled.
    pub fn into_value(mut self) -> Value {
        match self.stack.pop() {
            Some(OutFrame::Slot(Some(v))) => v,
            _ => Value::Null,
        }
    }

    fn emit(&mut self, name: &str, value: Value) {
        match self.stack.last_mut() {
            Some(OutFrame::Object(map)) => {
                map.insert(name.to_string(), value);
            }
            Some(OutFrame::Array(items)) => items.push(value),
            Some(OutFrame::Slot(slot)) => *slot = Some(value),
            None => {}
        }
    }

    /// Run `f` with a fresh frame on the stack and return what it built.
    fn nested(
        &mut self,
        frame: OutFrame,
        f: impl FnOnce(&mut Self) -> XdrResult<()>,
    ) -> XdrResult<Value> {
        self.stack.push(frame);
        let result = f(self);
        let built = match self.stack.pop() {
            Some(OutFrame::Object(map)) => Value::Object(map),
            Some(OutFrame::Array(items)) => Value::Array(items),
            Some(OutFrame::Slot(v)) => v.unwrap_or(Value::Null),
            None => Value::Null,
        };
        result.map(|()| built)
    }
}

fn float_value(v: f64) -> XdrResult<Value> {
    Number::from_f64(v)
        .map(Value::Number)
        .ok_or_else(|| XdrError::msg(format!("{} cannot be represented in JSON", v)))
}

impl XdrVisitor for JsonOut {
    fn sprintf(&self, args: fmt::Arguments<'_>) -> String {
        fmt::format(args)
    }

    fn marshal(&mut self, name: &str, value: XdrValue<'_>) -> XdrResult<()> {
        let json = match value {
            XdrValue::Num32(n) => match n.num_kind() {
                NumKind::Signed => Value::from(n.get_u32() as i32),
                NumKind::Unsigned => Value::from(n.get_u32()),
                NumKind::Bool => Value::Bool(n.get_u32() != 0),
                NumKind::Float => float_value(f64::from(f32::from_bits(n.get_u32())))?,
            },
            XdrValue::Num64(n) => match n.num_kind() {
                NumKind::Signed => Value::String((n.get_u64() as i64).to_string()),
                NumKind::Unsigned | NumKind::Bool => Value::String(n.get_u64().to_string()),
                NumKind::Float => float_value(f64::from_bits(n.get_u64()))?,
            },
            XdrValue::Enum(e) => Value::String(e.xdr_enum_string()),
            XdrValue::FixedBytes(b) => Value::String(STANDARD.encode(b)),
            XdrValue::VarBytes(b) => Value::String(STANDARD.encode(b.get_bytes())),
            XdrValue::String(s) => Value::String(s.get_string().to_string()),
            XdrValue::Optional(o) => {
                if o.get_present() {
                    self.nested(OutFrame::Slot(None), |s| o.xdr_marshal_value(s, ""))?
                } else {
                    Value::Null
                }
            }
            XdrValue::Vector(vec) => {
                let n = vec.get_vec_len();
                if vec.xdr_fixed_len().is_none() && n > vec.xdr_bound() {
                    return Err(XdrError::LengthExceedsBound {
                        type_name: vec.xdr_type_name(),
                        len: u64::from(n),
                        bound: vec.xdr_bound(),
                    });
                }
                self.nested(OutFrame::Array(Vec::with_capacity(n as usize)), |s| {
                    vec.xdr_marshal_n(s, "", n)
                })?
            }
            XdrValue::Aggregate(a) => {
                self.nested(OutFrame::Object(Map::new()), |s| a.xdr_marshal(s, ""))?
            }
        };
        self.emit(name, json);
        Ok(())
    }
}

enum InFrame {
    Object(Map<String, Value>),
    Array(std::vec::IntoIter<Value>),
    Slot(Option<Value>),
}

/// Visitor populating a value from a [`serde_json::Value`].
///
/// The first problem aborts the walk; the error names the JSON path.
pub struct JsonIn {
    stack: Vec<InFrame>,
    path: Vec<String>,
    index: Vec<u32>,
}

impl JsonIn {
    pub fn new(json: Value) -> Self {
        Self {
            stack: vec![InFrame::Slot(Some(json))],
            path: Vec::new(),
            index: Vec::new(),
        }
    }

    fn error(&self, message: impl fmt::Display) -> XdrError {
        XdrError::Json {
            path: self.path.concat(),
            message: message.to_string(),
        }
    }

    /// Take the value for `name` out of the innermost frame.
    fn take(&mut self, name: &str) -> (String, Option<Value>) {
        match self.stack.last_mut() {
            Some(InFrame::Object(map)) => {
                let segment = if self.path.iter().all(String::is_empty) {
                    name.to_string()
                } else {
                    format!(".{}", name)
                };
                (segment, map.remove(name))
            }
            Some(InFrame::Array(items)) => {
                let i = self.index.last_mut().map_or(0, |i| {
                    *i += 1;
                    *i - 1
                });
                (format!("[{}]", i), items.next())
            }
            Some(InFrame::Slot(slot)) => (String::new(), slot.take()),
            None => (String::new(), None),
        }
    }

    fn nested(
        &mut self,
        frame: InFrame,
        f: impl FnOnce(&mut Self) -> XdrResult<()>,
    ) -> XdrResult<()> {
        let is_array = matches!(frame, InFrame::Array(_));
        if is_array {
            self.index.push(0);
        }
        self.stack.push(frame);
        let result = f(self);
        self.stack.pop();
        if is_array {
            self.index.pop();
        }
        result
    }

    fn fill(&mut self, json: Option<Value>, value: XdrValue<'_>) -> XdrResult<()> {
        if let XdrValue::Optional(o) = value {
            return match json {
                None | Some(Value::Null) => {
                    o.set_present(false);
                    Ok(())
                }
                Some(element) => {
                    o.set_present(true);
                    self.nested(InFrame::Slot(Some(element)), |s| o.xdr_marshal_value(s, ""))
                }
            };
        }

        let json = json.ok_or_else(|| self.error("missing field"))?;
        let type_name = value.type_name();
        let mismatch = |s: &Self, json: &Value| s.error(format!("{} cannot hold {}", type_name, json));
        match value {
            XdrValue::Num32(n) => {
                let bits = match n.num_kind() {
                    NumKind::Signed => json
                        .as_i64()
                        .and_then(|v| i32::try_from(v).ok())
                        .map(|v| v as u32),
                    NumKind::Unsigned => json.as_u64().and_then(|v| u32::try_from(v).ok()),
                    NumKind::Bool => json.as_bool().map(u32::from),
                    NumKind::Float => json.as_f64().map(|v| (v as f32).to_bits()),
                };
                let bits = bits.ok_or_else(|| mismatch(self, &json))?;
                n.set_u32(bits).map_err(|e| self.error(e))
            }
            XdrValue::Num64(n) => {
                let bits = match (n.num_kind(), &json) {
                    (NumKind::Float, _) => json.as_f64().map(f64::to_bits),
                    (NumKind::Signed, Value::String(s)) => s.parse::<i64>().ok().map(|v| v as u64),
                    (NumKind::Signed, _) => json.as_i64().map(|v| v as u64),
                    (_, Value::String(s)) => s.parse::<u64>().ok(),
                    (_, _) => json.as_u64(),
                };
                let bits = bits.ok_or_else(|| mismatch(self, &json))?;
                n.set_u64(bits).map_err(|e| self.error(e))
            }
            XdrValue::Enum(e) => {
                let text = json.as_str().ok_or_else(|| mismatch(self, &json))?;
                e.xdr_enum_scan(text).map_err(|err| self.error(err))
            }
            XdrValue::FixedBytes(b) => {
                let bytes = self.base64(&json)?;
                if bytes.len() != b.len() {
                    return Err(self.error(format!("expected {} bytes, got {}", b.len(), bytes.len())));
                }
                b.copy_from_slice(&bytes);
                Ok(())
            }
            XdrValue::VarBytes(b) => {
                let bytes = self.base64(&json)?;
                b.set_bytes(bytes).map_err(|e| self.error(e))
            }
            XdrValue::String(s) => match json {
                Value::String(text) => s.set_string(text).map_err(|e| self.error(e)),
                other => Err(mismatch(self, &other)),
            },
            XdrValue::Vector(vec) => match json {
                Value::Array(items) => {
                    let n = u32::try_from(items.len()).map_err(|e| self.error(e))?;
                    vec.set_vec_len(n).map_err(|e| self.error(e))?;
                    self.nested(InFrame::Array(items.into_iter()), |s| vec.xdr_marshal_n(s, "", n))
                }
                other => Err(mismatch(self, &other)),
            },
            XdrValue::Aggregate(a) => match json {
                Value::Object(map) => self.nested(InFrame::Object(map), |s| a.xdr_marshal(s, "")),
                other => Err(mismatch(self, &other)),
            },
            XdrValue::Optional(_) => Ok(()),
        }
    }

    fn base64(&self, json: &Value) -> XdrResult<Vec<u8>> {
        let text = json
            .as_str()
            .ok_or_else(|| self.error(format!("expected base64 string, got {}", json)))?;
        STANDARD.decode(text).map_err(|e| self.error(e))
    }
}

impl XdrVisitor for JsonIn {
    /// Aggregates are walked with an empty prefix, so this yields the
    /// bare field name used as the object key.
    fn sprintf(&self, args: fmt::Arguments<'_>) -> String {
        fmt::format(args)
    }

    fn marshal(&mut self, name: &str, value: XdrValue<'_>) -> XdrResult<()> {
        let (segment, json) = self.take(name);
        self.path.push(segment);
        let result = self.fill(json, value);
        self.path.pop();
        result
    }
}

/// Render `value` as a JSON value.
pub fn to_json_value<T: XdrType + ?Sized>(value: &mut T) -> XdrResult<Value> {
    let mut out = JsonOut::new();
    value.xdr_marshal_value(&mut out, "")?;
    Ok(out.into_value())
}

/// Render `value` as compact JSON text.
pub fn to_json<T: XdrType + ?Sized>(value: &mut T) -> XdrResult<String> {
    let json = to_json_value(value)?;
    serde_json::to_string(&json).map_err(XdrError::msg)
}

/// Build a fresh value from JSON.
pub fn from_json_value<T: XdrType + Default>(json: Value) -> XdrResult<T> {
    let mut value = T::default();
    let mut input = JsonIn::new(json);
    value.xdr_marshal_value(&mut input, "")?;
    Ok(value)
}

/// Build a fresh value from JSON text.
pub fn from_json<T: XdrType + Default>(text: &str) -> XdrResult<T> {
    let json: Value = serde_json::from_str(text).map_err(|e| XdrError::Json {
        path: String::new(),
        message: e.to_string(),
    })?;
    from_json_value(json)
}

/// Adapter that lets any generated type take part in serde.
///
/// ```
/// use rxdr::Json;
///
/// let text = serde_json::to_string(&Json(7i64)).unwrap();
/// assert_eq!(text, "\"7\"");
/// let back: Json<i64> = serde_json::from_str(&text).unwrap();
/// assert_eq!(back.0, 7);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Json<T>(pub T);

impl<T: XdrType + Clone> Serialize for Json<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut copy = self.0.clone();
        to_json_value(&mut copy)
            .map_err(ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de, T: XdrType + Default> Deserialize<'de> for Json<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = Value::deserialize(deserializer)?;
        from_json_value(json).map(Json).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FixedOpaque, XdrString, XdrVec};
    use serde_json::json;

    #[test]
    fn test_scalars() {
        assert_eq!(to_json_value(&mut -5i32).unwrap(), json!(-5));
        assert_eq!(to_json_value(&mut 5u32).unwrap(), json!(5));
        assert_eq!(to_json_value(&mut -5i64).unwrap(), json!("-5"));
        assert_eq!(to_json_value(&mut u64::MAX).unwrap(), json!("18446744073709551615"));
        assert_eq!(to_json_value(&mut true).unwrap(), json!(true));
        assert_eq!(to_json_value(&mut 1.5f64).unwrap(), json!(1.5));
        assert!(to_json_value(&mut f64::NAN).is_err());
    }

    #[test]
    fn test_containers() {
        let mut v = XdrVec::<i32, 4>::from(vec![1, 2]);
        assert_eq!(to_json_value(&mut v).unwrap(), json!([1, 2]));
        let mut o: Option<Box<XdrString<4>>> = Some(Box::new("ab".into()));
        assert_eq!(to_json_value(&mut o).unwrap(), json!("ab"));
        let mut none: Option<Box<i32>> = None;
        assert_eq!(to_json_value(&mut none).unwrap(), Value::Null);
        let mut h = FixedOpaque::new([0xff, 0, 1]);
        assert_eq!(to_json_value(&mut h).unwrap(), json!("/wAB"));
    }

    #[test]
    fn test_parse_scalars() {
        assert_eq!(from_json::<i64>("\"-9\"").unwrap(), -9);
        assert_eq!(from_json::<i64>("12").unwrap(), 12);
        assert_eq!(from_json::<u32>("7").unwrap(), 7);
        assert_eq!(from_json::<XdrVec<u32>>("[1,2,3]").unwrap().len(), 3);
        assert_eq!(from_json::<Option<Box<u32>>>("null").unwrap(), None);
        assert_eq!(from_json::<FixedOpaque<3>>("\"/wAB\"").unwrap().0, [0xff, 0, 1]);
    }

    #[test]
    fn test_parse_errors_name_path() {
        match from_json::<XdrVec<i32, 4>>("[1, \"x\"]") {
            Err(XdrError::Json { path, .. }) => assert_eq!(path, "[1]"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            from_json::<XdrVec<i32, 1>>("[1, 2]"),
            Err(XdrError::Json { .. })
        ));
        assert!(from_json::<u32>("-1").is_err());
        assert!(from_json::<FixedOpaque<2>>("\"/wAB\"").is_err());
    }
}
