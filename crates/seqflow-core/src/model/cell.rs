//! Valores de celda y tipos de columna de una `Table`.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tipo declarado de una columna.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellType {
    Text,
    Integer,
    Float,
    Boolean,
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CellType::Text => "text",
            CellType::Integer => "integer",
            CellType::Float => "float",
            CellType::Boolean => "boolean",
        };
        f.write_str(s)
    }
}

/// Valor de una celda. `Null` representa la ausencia de valor (celda vacía).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Tipo del valor, `None` para `Null`.
    pub fn cell_type(&self) -> Option<CellType> {
        match self {
            CellValue::Null => None,
            CellValue::Bool(_) => Some(CellType::Boolean),
            CellValue::Int(_) => Some(CellType::Integer),
            CellValue::Float(_) => Some(CellType::Float),
            CellValue::Text(_) => Some(CellType::Text),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Adapta el valor al tipo de una columna. `Null` encaja en cualquier
    /// columna y un entero se promueve a float; el resto debe coincidir.
    pub fn coerce_to(self, ty: CellType) -> Result<CellValue, CellValue> {
        match (self, ty) {
            (CellValue::Null, _) => Ok(CellValue::Null),
            (CellValue::Int(i), CellType::Float) => Ok(CellValue::Float(i as f64)),
            (v, ty) if v.cell_type() == Some(ty) => Ok(v),
            (v, _) => Err(v),
        }
    }

    /// Clave de identidad usada para unicidad y joins. `None` para `Null`.
    pub fn identity_key(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Float(x) => write!(f, "{x}"),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<f64> for CellValue {
    fn from(x: f64) -> Self {
        CellValue::Float(x)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(CellValue::Null)
    }
}
