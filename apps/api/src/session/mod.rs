// Session-scoped UI state: one extraction plus the user's annotations per session.
// In-memory only; nothing survives a restart.

pub mod handlers;
pub mod store;
