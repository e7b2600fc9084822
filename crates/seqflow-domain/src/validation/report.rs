use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellErrorKind {
    Missing,
    Invalid,
    Duplicate,
}

/// Error de una celda. `row` empieza en 1 (fila de datos, sin cabecera).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellError {
    pub row: usize,
    pub column_label: String,
    pub column_index: usize,
    pub kind: CellErrorKind,
    pub message: String,
}

impl CellError {
    /// Coordenada estilo hoja de cálculo (`"B3"`).
    pub fn cell_ref(&self) -> String {
        format!("{}{}", column_letter(self.column_index), self.row)
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row {}: {}", self.row, self.message)
    }
}

/// `0 -> A`, `25 -> Z`, `26 -> AA`.
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Resultado de una pasada de validación: errores de celda y errores que no
/// pertenecen a una celda (tabla vacía, opciones sin usar, columnas extra).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub general: Vec<String>,
    pub cells: Vec<CellError>,
}

impl ValidationReport {
    pub fn is_empty(&self) -> bool {
        self.general.is_empty() && self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.general.len() + self.cells.len()
    }

    pub fn push_general(&mut self, message: impl Into<String>) {
        let message = message.into();
        if !self.general.contains(&message) {
            self.general.push(message);
        }
    }

    pub fn push_cell(&mut self, error: CellError) {
        self.cells.push(error);
    }

    pub fn merge(&mut self, other: ValidationReport) {
        for g in other.general {
            self.push_general(g);
        }
        self.cells.extend(other.cells);
    }

    pub fn errors_in_row(&self, row: usize) -> impl Iterator<Item = &CellError> {
        self.cells.iter().filter(move |e| e.row == row)
    }

    /// Mensajes en el formato que se muestra al usuario.
    pub fn messages(&self) -> Vec<String> {
        self.general.iter().cloned().chain(self.cells.iter().map(CellError::to_string)).collect()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} general error(s), {} cell error(s)", self.general.len(), self.cells.len())
    }
}
