//! JSON:API boundary for tasks: wire documents and HTTP handlers.
pub mod document;
pub mod v1;
