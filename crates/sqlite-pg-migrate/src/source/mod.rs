//! Source database access.

mod sqlite;

pub use sqlite::{SqliteExtractor, SqliteSource};

use futures::stream::{self, BoxStream, Stream, StreamExt, TryChunksError, TryStreamExt};
use tracing::debug;

use crate::core::{Record, SourceReader};
use crate::error::{MigrateError, Result};

struct Cursor<'a, R: ?Sized> {
    reader: &'a mut R,
    table: &'a str,
    offset: u64,
    exhausted: bool,
}

/// Stream a table page by page through [`SourceReader::fetch_page`].
///
/// The next page is requested only after the current one is drained, and
/// a page shorter than the page size ends the stream.
pub fn paged_rows<'a, R>(reader: &'a mut R, table: &'a str) -> BoxStream<'a, Result<Record>>
where
    R: SourceReader + ?Sized,
{
    let cursor = Cursor {
        reader,
        table,
        offset: 0,
        exhausted: false,
    };

    stream::try_unfold(cursor, next_page::<R>)
        .map_ok(|page| stream::iter(page.into_iter().map(Ok::<_, MigrateError>)))
        .try_flatten()
        .boxed()
}

/// Regroup the rows of one open cursor into pages of `page_size`.
///
/// Each page is read in full before its rows are handed on, and
/// `pages_fetched` counts the pages as they complete.
pub(crate) fn cursor_pages<'a, S>(
    rows: S,
    page_size: usize,
    pages_fetched: &'a mut usize,
) -> BoxStream<'a, Result<Record>>
where
    S: Stream<Item = Result<Record>> + Send + 'a,
{
    rows.try_chunks(page_size.max(1))
        .map_err(|TryChunksError(_, err)| err)
        .inspect_ok(move |page| {
            *pages_fetched += 1;
            debug!("page {}: {} rows", pages_fetched, page.len());
        })
        .map_ok(|page| stream::iter(page.into_iter().map(Ok::<_, MigrateError>)))
        .try_flatten()
        .boxed()
}

async fn next_page<'a, R>(mut cursor: Cursor<'a, R>) -> Result<Option<(Vec<Record>, Cursor<'a, R>)>>
where
    R: SourceReader + ?Sized,
{
    if cursor.exhausted {
        return Ok(None);
    }

    let limit = cursor.reader.page_size().max(1);
    let page = cursor
        .reader
        .fetch_page(cursor.table, cursor.offset, limit)
        .await?;
    debug!(
        "{}: fetched {} rows at offset {}",
        cursor.table,
        page.len(),
        cursor.offset
    );

    cursor.offset += page.len() as u64;
    cursor.exhausted = page.len() < limit;
    if page.is_empty() {
        return Ok(None);
    }
    Ok(Some((page, cursor)))
}
