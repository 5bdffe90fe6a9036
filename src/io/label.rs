//! PDS3 (ODL) label parsing.
//!
//! Handles the subset of ODL found in Diviner and LOLA labels: `KEY = VALUE`
//! statements, nested `OBJECT`/`GROUP` blocks, quoted text (which may span
//! lines), `( ... )` and `{ ... }` sequences, `<unit>` suffixes, `/* */`
//! comments and the terminating `END`. Anything after `END` is ignored.
//! The grammar lives in `label.pest`.

use crate::types::{DivinerError, DivinerResult};
use pest::iterators::{Pair, Pairs};
use pest::Parser;
use std::path::Path;

/// A parsed label value
#[derive(Debug, Clone, PartialEq)]
pub enum LabelValue {
    Integer(i64),
    Real(f64),
    /// Number with a unit, e.g. `1737.4 <KM>`
    Quantity { value: f64, unit: String },
    /// Double-quoted text
    Text(String),
    /// Bare or single-quoted symbol, dates included
    Symbol(String),
    Sequence(Vec<LabelValue>),
    /// Contents of an `OBJECT` or `GROUP` block
    Block(Label),
}

impl LabelValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            LabelValue::Integer(v) => Some(*v as f64),
            LabelValue::Real(v) => Some(*v),
            LabelValue::Quantity { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            LabelValue::Text(s) | LabelValue::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&Label> {
        match self {
            LabelValue::Block(label) => Some(label),
            _ => None,
        }
    }
}

/// Ordered key/value statements of a label or block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Label {
    entries: Vec<(String, LabelValue)>,
}

impl Label {
    pub fn parse(text: &str) -> DivinerResult<Self> {
        let mut pairs = LabelParser::parse(Rule::label, text)
            .map_err(|e| DivinerError::Parse(format!("Invalid label: {}", e)))?;
        let root = pairs
            .next()
            .ok_or_else(|| DivinerError::Parse("Empty label".to_string()))?;
        parse_statements(root.into_inner())
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> DivinerResult<Self> {
        let path = path.as_ref();
        log::debug!("Parsing label: {}", path.display());
        let bytes = std::fs::read(path)?;
        // attached labels are followed by binary data after END
        Self::parse(&String::from_utf8_lossy(&bytes))
    }

    pub fn entries(&self) -> &[(String, LabelValue)] {
        &self.entries
    }

    /// First value stored under `key` at this level
    pub fn get(&self, key: &str) -> Option<&LabelValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Follow a path of block names down to a value
    pub fn get_path(&self, path: &[&str]) -> Option<&LabelValue> {
        let (last, blocks) = path.split_last()?;
        let mut current = self;
        for name in blocks {
            current = current.get(name)?.as_block()?;
        }
        current.get(last)
    }

    /// Numeric value at `path`, or a parse error naming the missing key
    pub fn number_at(&self, path: &[&str]) -> DivinerResult<f64> {
        let value = self.get_path(path).ok_or_else(|| {
            DivinerError::Parse(format!("Label has no key {}", path.join(".")))
        })?;
        value.as_f64().ok_or_else(|| {
            DivinerError::Parse(format!(
                "Label key {} is not numeric: {:?}",
                path.join("."),
                value
            ))
        })
    }
}

#[derive(pest_derive::Parser)]
#[grammar = "io/label.pest"]
struct LabelParser;

// recompile when the grammar changes
const _GRAMMAR: &str = include_str!("label.pest");

fn parse_statements(pairs: Pairs<Rule>) -> DivinerResult<Label> {
    let mut label = Label::default();
    for pair in pairs {
        match pair.as_rule() {
            Rule::assignment => {
                let mut inner = pair.into_inner();
                let (key, value) = match (inner.next(), inner.next()) {
                    (Some(key), Some(value)) => (key, value),
                    _ => return Err(DivinerError::Parse("Incomplete label statement".to_string())),
                };
                label.entries.push((key.as_str().to_string(), parse_value(value)?));
            }
            Rule::object | Rule::group => {
                // OBJECT = NAME ... END_OBJECT [= NAME]; the closing name is not checked
                let mut inner = pair.into_inner();
                let name = inner
                    .find(|p| p.as_rule() == Rule::key)
                    .ok_or_else(|| DivinerError::Parse("Label block without a name".to_string()))?
                    .as_str()
                    .to_string();
                let block = parse_statements(inner)?;
                label.entries.push((name, LabelValue::Block(block)));
            }
            _ => {}
        }
    }
    Ok(label)
}

fn parse_value(pair: Pair<Rule>) -> DivinerResult<LabelValue> {
    let text = pair.as_str();
    match pair.as_rule() {
        Rule::integer => Ok(text
            .parse::<i64>()
            .map(LabelValue::Integer)
            .unwrap_or_else(|_| LabelValue::Real(parse_real(text)))),
        Rule::real => Ok(LabelValue::Real(parse_real(text))),
        Rule::radix_int => {
            let mut inner = pair.into_inner();
            let (base, digits) = match (inner.next(), inner.next()) {
                (Some(base), Some(digits)) => (base.as_str(), digits.as_str()),
                _ => return Err(DivinerError::Parse(format!("Malformed radix integer {}", text))),
            };
            base.parse::<u32>()
                .ok()
                .filter(|radix| (2..=16).contains(radix))
                .and_then(|radix| i64::from_str_radix(digits, radix).ok())
                .map(LabelValue::Integer)
                .ok_or_else(|| DivinerError::Parse(format!("Invalid radix integer {}", text)))
        }
        Rule::quantity => {
            let mut inner = pair.into_inner();
            let (number, unit) = match (inner.next(), inner.next()) {
                (Some(number), Some(unit)) => (number, unit),
                _ => return Err(DivinerError::Parse(format!("Malformed quantity {}", text))),
            };
            let unit = delimited(unit.as_str()).trim().to_string();
            let value = parse_value(number)?
                .as_f64()
                .ok_or_else(|| DivinerError::Parse(format!("Malformed quantity {}", text)))?;
            Ok(LabelValue::Quantity { value, unit })
        }
        Rule::text => Ok(LabelValue::Text(normalize_text(delimited(text)))),
        Rule::symbol => Ok(LabelValue::Symbol(delimited(text).to_string())),
        Rule::bare => Ok(LabelValue::Symbol(text.to_string())),
        Rule::sequence | Rule::set => pair
            .into_inner()
            .map(parse_value)
            .collect::<DivinerResult<Vec<_>>>()
            .map(LabelValue::Sequence),
        other => Err(DivinerError::Parse(format!(
            "Unexpected {:?} in label value: {}",
            other, text
        ))),
    }
}

/// The grammar only hands over well-formed reals
fn parse_real(text: &str) -> f64 {
    text.parse().unwrap_or(f64::NAN)
}

/// Strip the quote or bracket characters around a token
fn delimited(token: &str) -> &str {
    token.get(1..token.len().saturating_sub(1)).unwrap_or("")
}

fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const L3_LABEL: &str = r#"PDS_VERSION_ID = PDS3
/* File identification */
RECORD_TYPE = UNDEFINED
^IMAGE = "dgdr_st_clc_cyl_20090115n_128_jp2.jp2"
PRODUCT_ID = DGDR_ST_CLC_CYL_20090115N_128_JP2
START_TIME = 2009-01-15T00:00:00
DESCRIPTION = "Regolith temperature
    gridded at 128 pixels per degree."

OBJECT = COMPRESSED_FILE
  FILE_NAME = "dgdr_st_clc_cyl_20090115n_128_jp2.jp2"
END_OBJECT = COMPRESSED_FILE

OBJECT = UNCOMPRESSED_FILE
  FILE_NAME = "dgdr_st_clc_cyl_20090115n_128_img.img"
  OBJECT = IMAGE
    LINES = 23040
    LINE_SAMPLES = 46080
    SAMPLE_BITS = 16
    SCALING_FACTOR = 0.0025
    OFFSET = 200.0
    MISSING_CONSTANT = -32768
    FILTER_NAME = ("A", "B")
  END_OBJECT = IMAGE
END_OBJECT = UNCOMPRESSED_FILE

OBJECT = IMAGE_MAP_PROJECTION
  A_AXIS_RADIUS = 1737.4 <KM>
  MAP_PROJECTION_TYPE = "SIMPLE CYLINDRICAL"
  SAMPLE_BIT_MASK = 2#0111111111111111#
END_OBJECT
END
"#;

    #[test]
    fn test_calibration_keys() {
        let label = Label::parse(L3_LABEL).unwrap();
        let image = ["UNCOMPRESSED_FILE", "IMAGE"];
        let key = |k: &'static str| [image[0], image[1], k];

        assert_eq!(label.number_at(&key("SCALING_FACTOR")).unwrap(), 0.0025);
        assert_eq!(label.number_at(&key("OFFSET")).unwrap(), 200.0);
        assert_eq!(label.number_at(&key("MISSING_CONSTANT")).unwrap(), -32768.0);
        assert_eq!(
            label.get_path(&key("LINES")),
            Some(&LabelValue::Integer(23040))
        );
    }

    #[test]
    fn test_values() {
        let label = Label::parse(L3_LABEL).unwrap();
        assert_eq!(label.get("PDS_VERSION_ID").and_then(|v| v.as_str()), Some("PDS3"));
        assert_eq!(
            label.get("DESCRIPTION").and_then(|v| v.as_str()),
            Some("Regolith temperature gridded at 128 pixels per degree.")
        );
        assert_eq!(
            label.get_path(&["IMAGE_MAP_PROJECTION", "A_AXIS_RADIUS"]),
            Some(&LabelValue::Quantity { value: 1737.4, unit: "KM".to_string() })
        );
        assert_eq!(
            label.get_path(&["IMAGE_MAP_PROJECTION", "SAMPLE_BIT_MASK"]),
            Some(&LabelValue::Integer(0x7fff))
        );
        assert_eq!(
            label.get_path(&["UNCOMPRESSED_FILE", "IMAGE", "FILTER_NAME"]),
            Some(&LabelValue::Sequence(vec![
                LabelValue::Text("A".to_string()),
                LabelValue::Text("B".to_string()),
            ]))
        );
        assert!(label.get("^IMAGE").is_some());
    }

    #[test]
    fn test_missing_key() {
        let label = Label::parse(L3_LABEL).unwrap();
        let err = label.number_at(&["UNCOMPRESSED_FILE", "IMAGE", "NOPE"]);
        assert!(matches!(err, Err(DivinerError::Parse(_))));
        let err = label.number_at(&["UNCOMPRESSED_FILE", "FILE_NAME"]);
        assert!(matches!(err, Err(DivinerError::Parse(_))));
    }

    #[test]
    fn test_malformed() {
        assert!(Label::parse("OBJECT = IMAGE\nLINES = 3\n").is_err());
        assert!(Label::parse("END_OBJECT = IMAGE\n").is_err());
        assert!(Label::parse("KEY =\n").is_err());
    }

    #[test]
    fn test_groups_sets_and_dates() {
        let text = "GROUP = TIMES /* inline comment */\n\
                    START_TIME = 2009-07-05T00:00:00.000\n\
                    STOP_TIME = 2009-07-30\n\
                    END_GROUP = TIMES\n\
                    BANDS = {7, 8, 9}\n\
                    EXPOSURE = 1.5E-3 <s>\n\
                    NAME = 'LRO'\n\
                    END";
        let label = Label::parse(text).unwrap();
        assert_eq!(
            label.get_path(&["TIMES", "START_TIME"]).and_then(|v| v.as_str()),
            Some("2009-07-05T00:00:00.000")
        );
        assert_eq!(
            label.get_path(&["TIMES", "STOP_TIME"]),
            Some(&LabelValue::Symbol("2009-07-30".to_string()))
        );
        assert_eq!(
            label.get("BANDS"),
            Some(&LabelValue::Sequence(vec![
                LabelValue::Integer(7),
                LabelValue::Integer(8),
                LabelValue::Integer(9),
            ]))
        );
        assert_eq!(
            label.get("EXPOSURE"),
            Some(&LabelValue::Quantity { value: 1.5e-3, unit: "s".to_string() })
        );
        assert_eq!(label.get("NAME").and_then(|v| v.as_str()), Some("LRO"));
    }

    #[test]
    fn test_error_reports_position() {
        let err = Label::parse("A = 1\nB 2\nEND\n").unwrap_err();
        assert!(matches!(&err, DivinerError::Parse(msg) if msg.contains("2:3")));
    }

    #[test]
    fn test_binary_after_end() {
        let label = Label::parse("A = 1\nEND\n\u{0}\u{1}garbage = = =").unwrap();
        assert_eq!(label.get("A"), Some(&LabelValue::Integer(1)));
    }
}
