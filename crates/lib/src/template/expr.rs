//! Template expressions.
//!
//! [`Expr`] is the value type of every native template property. Intrinsic
//! functions serialize to the provider's JSON form:
//!
//! | variant | JSON |
//! |---|---|
//! | `Ref(n)` | `{"Ref": n}` |
//! | `GetAtt(r, a)` | `{"Fn::GetAtt": [r, a]}` |
//! | `Join(d, xs)` | `{"Fn::Join": [d, [xs...]]}` |

use std::collections::{BTreeMap, BTreeSet};

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
  Str(String),
  Int(i64),
  Bool(bool),
  List(Vec<Expr>),
  Map(BTreeMap<String, Expr>),
  Ref(String),
  GetAtt(String, String),
  Join(String, Vec<Expr>),
}

impl Expr {
  pub fn reference(name: impl Into<String>) -> Self {
    Expr::Ref(name.into())
  }

  pub fn get_att(resource: impl Into<String>, attribute: impl Into<String>) -> Self {
    Expr::GetAtt(resource.into(), attribute.into())
  }

  pub fn join(delimiter: impl Into<String>, parts: Vec<Expr>) -> Self {
    Expr::Join(delimiter.into(), parts)
  }

  pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Expr)>) -> Self {
    Expr::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
  }

  /// Visit this expression and every nested one, depth first.
  pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
    f(self);
    match self {
      Expr::List(items) | Expr::Join(_, items) => items.iter().for_each(|e| e.walk(f)),
      Expr::Map(map) => map.values().for_each(|e| e.walk(f)),
      _ => {}
    }
  }

  /// Names referenced through `Ref` anywhere in this expression.
  pub fn refs(&self) -> BTreeSet<&str> {
    let mut out = BTreeSet::new();
    self.walk(&mut |e| {
      if let Expr::Ref(name) = e {
        out.insert(name.as_str());
      }
    });
    out
  }
}

impl From<&str> for Expr {
  fn from(value: &str) -> Self {
    Expr::Str(value.to_string())
  }
}

impl From<String> for Expr {
  fn from(value: String) -> Self {
    Expr::Str(value)
  }
}

impl From<i64> for Expr {
  fn from(value: i64) -> Self {
    Expr::Int(value)
  }
}

impl From<bool> for Expr {
  fn from(value: bool) -> Self {
    Expr::Bool(value)
  }
}

impl From<Vec<Expr>> for Expr {
  fn from(value: Vec<Expr>) -> Self {
    Expr::List(value)
  }
}

impl Serialize for Expr {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      Expr::Str(s) => serializer.serialize_str(s),
      Expr::Int(i) => serializer.serialize_i64(*i),
      Expr::Bool(b) => serializer.serialize_bool(*b),
      Expr::List(items) => items.serialize(serializer),
      Expr::Map(map) => map.serialize(serializer),
      Expr::Ref(name) => {
        let mut m = serializer.serialize_map(Some(1))?;
        m.serialize_entry("Ref", name)?;
        m.end()
      }
      Expr::GetAtt(resource, attribute) => {
        let mut m = serializer.serialize_map(Some(1))?;
        m.serialize_entry("Fn::GetAtt", &[resource, attribute])?;
        m.end()
      }
      Expr::Join(delimiter, parts) => {
        let mut m = serializer.serialize_map(Some(1))?;
        m.serialize_entry("Fn::Join", &(delimiter, parts))?;
        m.end()
      }
    }
  }
}

impl<'de> Deserialize<'de> for Expr {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Expr::try_from(value).map_err(D::Error::custom)
  }
}

impl TryFrom<Value> for Expr {
  type Error = String;

  fn try_from(value: Value) -> Result<Self, Self::Error> {
    match value {
      Value::Null => Err("null is not a valid template value".to_string()),
      Value::Bool(b) => Ok(Expr::Bool(b)),
      Value::Number(n) => Ok(n.as_i64().map(Expr::Int).unwrap_or_else(|| Expr::Str(n.to_string()))),
      Value::String(s) => Ok(Expr::Str(s)),
      Value::Array(items) => items.into_iter().map(Expr::try_from).collect::<Result<_, _>>().map(Expr::List),
      Value::Object(map) => {
        if map.len() == 1
          && let Some((key, inner)) = map.iter().next()
        {
          match (key.as_str(), inner) {
            ("Ref", Value::String(name)) => return Ok(Expr::Ref(name.clone())),
            ("Fn::GetAtt", Value::Array(args)) => {
              if let [Value::String(r), Value::String(a)] = args.as_slice() {
                return Ok(Expr::GetAtt(r.clone(), a.clone()));
              }
              return Err("Fn::GetAtt expects [resource, attribute]".to_string());
            }
            ("Fn::Join", Value::Array(args)) => {
              if let [Value::String(d), Value::Array(parts)] = args.as_slice() {
                let parts = parts.iter().cloned().map(Expr::try_from).collect::<Result<_, _>>()?;
                return Ok(Expr::Join(d.clone(), parts));
              }
              return Err("Fn::Join expects [delimiter, [values]]".to_string());
            }
            _ => {}
          }
        }
        map
          .into_iter()
          .map(|(k, v)| Expr::try_from(v).map(|e| (k, e)))
          .collect::<Result<_, _>>()
          .map(Expr::Map)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn intrinsics_serialize_to_provider_form() {
    let expr = Expr::map([
      ("Bucket", Expr::reference("CodeBucket")),
      ("Arn", Expr::get_att("Role", "Arn")),
      ("Url", Expr::join("/", vec!["s3:/".into(), Expr::reference("CodeBucket")])),
      ("Memory", 128.into()),
      ("Enabled", true.into()),
    ]);

    assert_eq!(
      serde_json::to_value(&expr).unwrap(),
      json!({
        "Bucket": {"Ref": "CodeBucket"},
        "Arn": {"Fn::GetAtt": ["Role", "Arn"]},
        "Url": {"Fn::Join": ["/", ["s3:/", {"Ref": "CodeBucket"}]]},
        "Memory": 128,
        "Enabled": true,
      })
    );
  }

  #[test]
  fn intrinsics_are_recognized_on_read() {
    let value = json!({"Role": {"Fn::GetAtt": ["Role", "Arn"]}, "Name": {"Ref": "Stage"}});
    let expr: Expr = serde_json::from_value(value).unwrap();
    assert_eq!(
      expr,
      Expr::map([
        ("Name", Expr::reference("Stage")),
        ("Role", Expr::get_att("Role", "Arn")),
      ])
    );
  }

  #[test]
  fn maps_with_a_ref_key_among_others_stay_maps() {
    let value = json!({"Ref": "A", "Other": "b"});
    let expr: Expr = serde_json::from_value(value).unwrap();
    assert!(matches!(expr, Expr::Map(ref m) if m.len() == 2));
  }

  #[test]
  fn refs_are_collected_from_nested_values() {
    let expr = Expr::List(vec![
      Expr::reference("A"),
      Expr::join("", vec![Expr::reference("B"), Expr::map([("x", Expr::reference("C"))])]),
      Expr::get_att("D", "Arn"),
    ]);
    assert_eq!(expr.refs().into_iter().collect::<Vec<_>>(), vec!["A", "B", "C"]);
  }
}
