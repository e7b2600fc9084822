//! Esquema Diesel. Reemplazable con `diesel print-schema`.

diesel::table! {
    workflow_sessions (session_id) {
        session_id -> Uuid,
        workflow_kind -> Text,
        created_at -> Timestamptz,
        snapshot -> Jsonb,
        updated_at -> Timestamptz,
    }
}
