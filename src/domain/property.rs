use serde::{Deserialize, Deserializer, Serialize};

/// A rental listing. Field names on the wire match what the listing page reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
  #[serde(rename = "propertyname")]
  pub name: String,
  #[serde(rename = "propertylocation", default)]
  pub location: String,
  #[serde(
    rename = "propertyprice",
    default,
    deserialize_with = "price_from_number_or_string"
  )]
  pub price: String,
  #[serde(rename = "propertydescription", default)]
  pub description: String,
  #[serde(
    rename = "propertyimage",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub image: Option<String>,
}

/// Listings written by other clients store the price as a number.
fn price_from_number_or_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  match serde_json::Value::deserialize(deserializer)? {
    serde_json::Value::String(s) => Ok(s),
    serde_json::Value::Number(n) => Ok(n.to_string()),
    serde_json::Value::Null => Ok(String::new()),
    other => Err(serde::de::Error::custom(format!(
      "expected number or string for propertyprice, got {}",
      other
    ))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_numeric_price_is_accepted() {
    let p: Property = serde_json::from_str(
      r#"{"propertyname":"Flat 1","propertylocation":"Leeds","propertyprice":850,"propertydescription":"Two bed"}"#,
    )
    .unwrap();
    assert_eq!(p.price, "850");
    assert_eq!(p.image, None);
  }

  #[test]
  fn test_wire_names() {
    let p = Property {
      name: "Loft".into(),
      location: "York".into(),
      price: "1200".into(),
      description: "Open plan".into(),
      image: Some("loft.jpg".into()),
    };
    let json = serde_json::to_value(&p).unwrap();
    assert_eq!(json["propertyname"], "Loft");
    assert_eq!(json["propertyprice"], "1200");
    assert_eq!(json["propertyimage"], "loft.jpg");
  }

  #[test]
  fn test_rejects_object_price() {
    let res = serde_json::from_str::<Property>(r#"{"propertyname":"x","propertyprice":{}}"#);
    assert!(res.is_err());
  }
}
