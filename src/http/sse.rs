use std::convert::Infallible;
use std::pin::Pin;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;

use crate::session::RecordingSession;
use crate::tracker::RangeEvent;

pub type RangeEventStream = Sse<Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>>;

fn event_name(event: &RangeEvent) -> &'static str {
    match event {
        RangeEvent::Highest { .. } => "highest",
        RangeEvent::Lowest { .. } => "lowest",
        RangeEvent::Reset => "reset",
    }
}

/// Build a Server-Sent Events stream of range changes for a session.
///
/// Events missed by a lagging client are skipped; the next change carries
/// the current value.
pub fn range_events(session: &RecordingSession) -> RangeEventStream {
    let stream = BroadcastStream::new(session.subscribe()).filter_map(|result| async move {
        match result {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(payload) => Some(Ok(Event::default().event(event_name(&event)).data(payload))),
                Err(_) => None,
            },
            Err(_) => None,
        }
    });

    Sse::new(Box::pin(stream) as Pin<Box<_>>).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(5))
            .text("range-keepalive"),
    )
}
