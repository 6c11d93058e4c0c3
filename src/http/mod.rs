//! Song lookup HTTP server.
//!
//! Serves the form-encoded range lookup as HTML and, when a recording
//! session is attached, JSON and SSE views of the live range plus
//! start/stop/reset controls.

mod page;
mod routes;
mod sse;

pub use page::{escape_html, render_lookup_page, NO_MATCH_MESSAGE, RESULT_TITLE};
pub use routes::{
    build_router, coerce_note, run_http_server, AppState, HealthResponse, HttpServerError,
    LookupForm,
};
pub use sse::RangeEventStream;
