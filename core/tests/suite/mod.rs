// Aggregates all integration tests as modules.
mod edits;
mod timeout;
