// Session creation and read-side views.
// Question generation goes through the coach; persistence through crate::store.

pub mod handlers;
pub mod service;
