//! Operaciones sobre secuencias de nucleótidos.
use crate::error::DomainError;

/// Complementa (A↔T, C↔G) e invierte. Sólo acepta `A`, `C`, `G`, `T`.
pub fn reverse_complement(seq: &str) -> Result<String, DomainError> {
    let mut out = String::with_capacity(seq.len());
    for (position, character) in seq.chars().enumerate() {
        let c = match character {
            'A' => 'T',
            'T' => 'A',
            'C' => 'G',
            'G' => 'C',
            _ => {
                return Err(DomainError::InvalidSequence { sequence: seq.to_string(),
                                                          position,
                                                          character })
            }
        };
        out.push(c);
    }
    Ok(out.chars().rev().collect())
}

/// Normaliza una secuencia de entrada: mayúsculas y sin espacios.
pub fn normalize(seq: &str) -> String {
    seq.chars().filter(|c| !c.is_whitespace()).flat_map(char::to_uppercase).collect()
}
