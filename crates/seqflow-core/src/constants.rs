//! Constantes del motor core.
//!
//! `ENGINE_VERSION` viaja en la cabecera de cada sesión persistida y entra en
//! el fingerprint de estado de un step. Cambiarla invalida los fingerprints
//! aunque los datos no cambien.

/// Versión lógica del motor de pasos.
pub const ENGINE_VERSION: &str = "S1.0";

/// Nombre de la tabla de comentarios que acumulan los steps.
pub const COMMENT_TABLE: &str = "comment_table";

/// Extensión de los snapshots de sesión en disco.
pub const SESSION_FILE_EXTENSION: &str = "msf";
