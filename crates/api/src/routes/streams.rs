//! Cursor handling shared by the polled message streams.

use domain::models::conversation::{MessagePage, MessagesQuery};
use shared::pagination::{clamp_limit, StreamCursor};

use crate::error::ApiError;

pub const DEFAULT_MESSAGE_LIMIT: i64 = 50;
pub const MAX_MESSAGE_LIMIT: i64 = 200;

/// Decoded `after` cursor and clamped limit.
pub fn window(query: &MessagesQuery) -> Result<(Option<StreamCursor>, i64), ApiError> {
    let after = query
        .after
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(StreamCursor::decode)
        .transpose()?;
    let limit = clamp_limit(query.limit, DEFAULT_MESSAGE_LIMIT, MAX_MESSAGE_LIMIT);
    Ok((after, limit))
}

/// Wraps an ascending page. An empty page hands the caller's cursor back so
/// polling resumes from the same spot.
pub fn page<T>(
    data: Vec<T>,
    after: Option<&str>,
    cursor_of: impl Fn(&T) -> StreamCursor,
) -> MessagePage<T> {
    let next_cursor = match data.last() {
        Some(last) => Some(cursor_of(last).encode()),
        None => after.filter(|s| !s.is_empty()).map(str::to_string),
    };
    MessagePage { data, next_cursor }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_window_defaults() {
        let (after, limit) = window(&MessagesQuery::default()).unwrap();
        assert!(after.is_none());
        assert_eq!(limit, DEFAULT_MESSAGE_LIMIT);
    }

    #[test]
    fn test_window_clamps_and_decodes() {
        let cursor = StreamCursor::new(Utc::now(), Uuid::new_v4());
        let query = MessagesQuery {
            after: Some(cursor.encode()),
            limit: Some(10_000),
        };
        let (after, limit) = window(&query).unwrap();
        assert_eq!(after.map(|c| c.id), Some(cursor.id));
        assert_eq!(limit, MAX_MESSAGE_LIMIT);
    }

    #[test]
    fn test_window_rejects_garbage_cursor() {
        let query = MessagesQuery {
            after: Some("not a cursor".into()),
            limit: None,
        };
        let err = window(&query).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_page_cursor() {
        let now = Utc::now();
        let ids = [Uuid::new_v4(), Uuid::new_v4()];
        let page = page(ids.to_vec(), None, |id| StreamCursor::new(now, *id));
        assert_eq!(
            page.next_cursor,
            Some(StreamCursor::new(now, ids[1]).encode())
        );

        let empty: MessagePage<Uuid> =
            super::page(Vec::new(), Some("abc"), |id| StreamCursor::new(now, *id));
        assert_eq!(empty.next_cursor.as_deref(), Some("abc"));
    }
}
