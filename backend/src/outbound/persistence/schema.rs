//! Diesel table definitions for the PostgreSQL schemas.
//!
//! Each service owns its own database: `users` lives in the users database
//! and `tasks` in the tasks database. The definitions must match the
//! embedded migrations under `backend/migrations/`.

diesel::table! {
    /// Registered accounts. `email` carries a unique index.
    users (id) {
        id -> Int4,
        username -> Varchar,
        email -> Varchar,
        password_hash -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Tasks keyed by an owner id that is not checked against `users`.
    tasks (id) {
        id -> Int4,
        created_date -> Timestamptz,
        title -> Varchar,
        description -> Nullable<Text>,
        is_completed -> Bool,
        user_id -> Int4,
    }
}
