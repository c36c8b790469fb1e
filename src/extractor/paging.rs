//! Lazy page-at-a-time enumeration of collections
//!
//! Two styles are supported:
//! - counted API listings ([`paged_entries`]): page N of a JSON listing, ended
//!   by an empty page, a short page or the declared page total;
//! - link following ([`link_following`]): page N of an HTML listing, ended by a
//!   terminal page or the absence of a next-page link.
//!
//! Nothing is fetched until the stream is polled, and dropping the stream is
//! enough to cancel.

use crate::utils::config::PagePolicy;
use crate::utils::error::Result;
use futures::future::Future;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tokio::time::sleep;
use tracing::{debug, warn};

/// One page of a counted listing
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total number of pages, when the API declares it
    pub total_pages: Option<u32>,
}

struct Cursor<S, F> {
    state: Option<S>,
    page: u32,
    total: Option<u32>,
    fetch: F,
}

/// Batches of a counted listing, one per fetched page.
///
/// `fetch` receives the threaded state (e.g. an API session) and the 0-based
/// page index and returns the updated state together with the page.
pub fn paged_batches<S, T, F, Fut>(
    state: S,
    policy: PagePolicy,
    fetch: F,
) -> BoxStream<'static, Result<Vec<T>>>
where
    S: Send + 'static,
    T: Send + 'static,
    F: FnMut(S, u32) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(S, Page<T>)>> + Send + 'static,
{
    let cursor = Cursor {
        state: Some(state),
        page: 0,
        total: None,
        fetch,
    };

    stream::try_unfold(cursor, move |mut cursor| async move {
        let Some(state) = cursor.state.take() else {
            return Ok(None);
        };
        if cursor.page > 0 && !policy.delay.is_zero() {
            sleep(policy.delay).await;
        }

        let (state, page) = (cursor.fetch)(state, cursor.page).await?;
        let count = page.items.len();
        if count == 0 {
            debug!("Page {} is empty, listing finished", cursor.page + 1);
            return Ok(None);
        }

        cursor.total = cursor.total.or(page.total_pages);
        let reached_total = cursor.total.is_some_and(|total| cursor.page + 1 >= total);
        let short_page = policy.page_size.is_some_and(|size| count < size);
        if !(reached_total || short_page) {
            cursor.state = Some(state);
        }
        cursor.page += 1;
        Ok(Some((page.items, cursor)))
    })
    .boxed()
}

/// Entries of a counted listing, flattened from [`paged_batches`]
pub fn paged_entries<S, T, F, Fut>(
    state: S,
    policy: PagePolicy,
    fetch: F,
) -> BoxStream<'static, Result<T>>
where
    S: Send + 'static,
    T: Send + 'static,
    F: FnMut(S, u32) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(S, Page<T>)>> + Send + 'static,
{
    paged_batches(state, policy, fetch)
        .map_ok(|items| stream::iter(items.into_iter().map(Ok)))
        .try_flatten()
        .boxed()
}

/// Outcome of scraping one page of a link-following listing
#[derive(Debug, Clone, PartialEq)]
pub enum LinkPage<T> {
    /// Entries found on the page and whether a next-page link exists
    Entries { items: Vec<T>, has_next: bool },
    /// Terminal page (error marker or no entries)
    End,
}

struct LinkCursor<F> {
    page: Option<u32>,
    fetch: F,
}

/// Entries of an HTML listing, following pages numbered from 1.
///
/// A failed page ends the listing with a warning unless the policy asks for
/// errors to be surfaced.
pub fn link_following<T, F, Fut>(policy: PagePolicy, fetch: F) -> BoxStream<'static, Result<T>>
where
    T: Send + 'static,
    F: FnMut(u32) -> Fut + Send + 'static,
    Fut: Future<Output = Result<LinkPage<T>>> + Send + 'static,
{
    let cursor = LinkCursor {
        page: Some(1),
        fetch,
    };

    stream::try_unfold(cursor, move |mut cursor| async move {
        let Some(page) = cursor.page.take() else {
            return Ok(None);
        };
        if page > 1 && !policy.delay.is_zero() {
            sleep(policy.delay).await;
        }

        let (items, has_next) = match (cursor.fetch)(page).await {
            Ok(LinkPage::Entries { items, has_next }) => (items, has_next),
            Ok(LinkPage::End) => return Ok(None),
            Err(e) if !policy.fatal_errors => {
                warn!("Unable to download page {}: {}", page, e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        if has_next {
            cursor.page = Some(page + 1);
        }
        Ok(Some((stream::iter(items.into_iter().map(Ok)), cursor)))
    })
    .try_flatten()
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ExtractError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn policy() -> PagePolicy {
        PagePolicy {
            delay: Duration::ZERO,
            page_size: None,
            fatal_errors: false,
        }
    }

    fn fixture_fetcher(
        pages: Vec<Vec<u32>>,
        total: Option<u32>,
        calls: Arc<AtomicU32>,
    ) -> impl FnMut((), u32) -> futures::future::Ready<Result<((), Page<u32>)>> + Send {
        move |(), index| {
            calls.fetch_add(1, Ordering::SeqCst);
            let items = pages.get(index as usize).cloned().unwrap_or_default();
            futures::future::ready(Ok((
                (),
                Page {
                    items,
                    total_pages: total,
                },
            )))
        }
    }

    #[tokio::test]
    async fn test_stops_after_empty_page() {
        let calls = Arc::new(AtomicU32::new(0));
        let pages = vec![vec![1, 2], vec![3, 4], vec![5], vec![], vec![6]];
        let fetch = fixture_fetcher(pages, None, calls.clone());
        let batches: Vec<_> = paged_batches((), policy(), fetch)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(batches, vec![vec![1, 2], vec![3, 4], vec![5]]);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_stops_at_declared_total() {
        let calls = Arc::new(AtomicU32::new(0));
        let pages = vec![vec![1], vec![2], vec![3], vec![4]];
        let fetch = fixture_fetcher(pages, Some(2), calls.clone());
        let items: Vec<_> = paged_entries((), policy(), fetch)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(items, vec![1, 2]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_short_page_ends_listing() {
        let calls = Arc::new(AtomicU32::new(0));
        let pages = vec![vec![1, 2], vec![3], vec![4, 5]];
        let items: Vec<_> = paged_entries(
            (),
            policy().with_page_size(2),
            fixture_fetcher(pages, None, calls.clone()),
        )
        .try_collect()
        .await
        .unwrap();
        assert_eq!(items, vec![1, 2, 3]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_early_drop_fetches_nothing_more() {
        let calls = Arc::new(AtomicU32::new(0));
        let pages = vec![vec![1, 2], vec![3, 4], vec![5, 6]];
        let first: Vec<_> = paged_entries((), policy(), fixture_fetcher(pages, None, calls.clone()))
            .take(2)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(first, vec![1, 2]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_state_is_threaded_between_pages() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let log = seen.clone();
        let items: Vec<u32> = paged_entries(0u32, policy(), move |token, index| {
            log.lock().unwrap().push(token);
            let page = if index < 3 { vec![index] } else { vec![] };
            futures::future::ready(Ok((token + 10, Page { items: page, total_pages: None })))
        })
        .try_collect()
        .await
        .unwrap();
        assert_eq!(items, vec![0, 1, 2]);
        assert_eq!(*seen.lock().unwrap(), vec![0, 10, 20, 30]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_skipped_for_first_page() {
        let pages = vec![vec![1], vec![2], vec![3]];
        let calls = Arc::new(AtomicU32::new(0));
        let policy = PagePolicy {
            delay: Duration::from_millis(500),
            ..policy()
        };
        let start = tokio::time::Instant::now();
        let mut stream = paged_entries((), policy, fixture_fetcher(pages, None, calls));

        assert_eq!(stream.next().await.unwrap().unwrap(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(stream.next().await.unwrap().unwrap(), 2);
        assert_eq!(start.elapsed(), Duration::from_millis(500));
        assert_eq!(stream.next().await.unwrap().unwrap(), 3);
        assert!(stream.next().await.is_none());
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_error_is_yielded_and_ends_stream() {
        let items: Vec<Result<u32>> = paged_entries((), policy(), |(), index| async move {
            if index == 0 {
                Ok(((), Page { items: vec![7], total_pages: None }))
            } else {
                Err(ExtractError::HttpStatus {
                    status: 500,
                    url: "https://api.example.com".to_string(),
                })
            }
        })
        .collect()
        .await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), &7);
        assert_eq!(items[1].as_ref().unwrap_err().status(), Some(500));
    }

    #[tokio::test]
    async fn test_link_following_until_no_next() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let items: Vec<u32> = link_following(policy(), move |page| {
            counter.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(Ok(LinkPage::Entries {
                items: vec![page * 10, page * 10 + 1],
                has_next: page < 3,
            }))
        })
        .try_collect()
        .await
        .unwrap();
        assert_eq!(items, vec![10, 11, 20, 21, 30, 31]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_link_following_error_policy() {
        let failing = |fatal_errors: bool| {
            link_following(PagePolicy { fatal_errors, ..policy() }, |page| async move {
                if page == 1 {
                    Ok(LinkPage::Entries { items: vec![1u32], has_next: true })
                } else {
                    Err(ExtractError::HttpStatus {
                        status: 503,
                        url: "https://www.erome.com/someone?page=2".to_string(),
                    })
                }
            })
        };

        let quiet: Vec<Result<u32>> = failing(false).collect().await;
        assert_eq!(quiet.len(), 1);
        assert!(quiet[0].is_ok());

        let loud: Vec<Result<u32>> = failing(true).collect().await;
        assert_eq!(loud.len(), 2);
        assert!(loud[1].is_err());
    }

    #[tokio::test]
    async fn test_link_following_terminal_page() {
        let items: Vec<u32> = link_following(policy(), |page| async move {
            Ok(if page == 1 {
                LinkPage::Entries { items: vec![1], has_next: true }
            } else {
                LinkPage::End
            })
        })
        .try_collect()
        .await
        .unwrap();
        assert_eq!(items, vec![1]);
    }
}
