//! Lazy enumeration of every key in a namespace.
//!
//! A listing is a chain of page requests: each page returns a batch of keys,
//! a completion flag and, when incomplete, a cursor for the next request.
//! [`enumerate_keys`] turns that chain into a single stream of keys. Every
//! call starts a fresh cursor chain; a stream cannot be rewound.

use std::collections::VecDeque;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};

use crate::{KeyRecord, KvError, KvNamespace, ListOptions};

/// Where the cursor chain currently stands.
enum Cursor {
    Start,
    Next(String),
    Done,
}

struct EnumState<'a> {
    namespace: &'a dyn KvNamespace,
    options: ListOptions,
    cursor: Cursor,
    buffered: VecDeque<KeyRecord>,
}

impl EnumState<'_> {
    fn page_options(&self, cursor: Option<String>) -> ListOptions {
        ListOptions {
            cursor,
            ..self.options.clone()
        }
    }
}

/// Stream every key matching `options`, fetching pages on demand.
///
/// `options.cursor` is ignored; enumeration always starts at the first page.
/// Pages are requested strictly one after another. If a page request fails
/// the error is yielded once and the stream ends.
pub fn enumerate_keys<'a>(
    namespace: &'a dyn KvNamespace,
    options: ListOptions,
) -> BoxStream<'a, Result<KeyRecord, KvError>> {
    let state = EnumState {
        namespace,
        options: ListOptions {
            cursor: None,
            ..options
        },
        cursor: Cursor::Start,
        buffered: VecDeque::new(),
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(key) = state.buffered.pop_front() {
                return Some((Ok(key), state));
            }

            let cursor = match std::mem::replace(&mut state.cursor, Cursor::Done) {
                Cursor::Done => return None,
                Cursor::Start => None,
                Cursor::Next(cursor) => Some(cursor),
            };

            let options = state.page_options(cursor);
            let page = match state.namespace.list(&options).await {
                Ok(page) => page,
                Err(e) => return Some((Err(e), state)),
            };

            state.cursor = if page.list_complete {
                Cursor::Done
            } else {
                match page.cursor {
                    Some(cursor) => Cursor::Next(cursor),
                    None => {
                        let err = KvError::MissingCursor(state.namespace.name().to_string());
                        return Some((Err(err), state));
                    }
                }
            };
            state.buffered.extend(page.keys);
        }
    })
    .boxed()
}

/// Drain [`enumerate_keys`] into a vector.
pub async fn collect_keys(
    namespace: &dyn KvNamespace,
    options: ListOptions,
) -> Result<Vec<KeyRecord>, KvError> {
    enumerate_keys(namespace, options).try_collect().await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::{InMemoryNamespace, ListPage};

    /// Counts list calls and can fail a given page.
    struct Instrumented {
        inner: InMemoryNamespace,
        calls: AtomicU32,
        fail_on_call: Option<u32>,
    }

    impl Instrumented {
        fn new(inner: InMemoryNamespace) -> Self {
            Self {
                inner,
                calls: AtomicU32::new(0),
                fail_on_call: None,
            }
        }

        fn failing_on(mut self, call: u32) -> Self {
            self.fail_on_call = Some(call);
            self
        }
    }

    #[async_trait]
    impl KvNamespace for Instrumented {
        fn name(&self) -> &str {
            self.inner.name()
        }

        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
            self.inner.get(key).await
        }

        async fn list(&self, options: &ListOptions) -> Result<ListPage, KvError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on_call == Some(call) {
                return Err(KvError::store(self.name(), "list", "connection reset"));
            }
            self.inner.list(options).await
        }
    }

    /// Never completes and never provides a cursor.
    struct Broken;

    #[async_trait]
    impl KvNamespace for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, KvError> {
            Ok(None)
        }

        async fn list(&self, _options: &ListOptions) -> Result<ListPage, KvError> {
            Ok(ListPage {
                keys: vec![KeyRecord::new("a")],
                list_complete: false,
                cursor: None,
            })
        }
    }

    fn packages(count: usize) -> InMemoryNamespace {
        let ns = InMemoryNamespace::new("packages");
        for i in 0..count {
            ns.put(format!("pkg-{:05}", i), "{}");
        }
        ns
    }

    #[tokio::test]
    async fn test_collect_spans_pages() {
        let ns = Instrumented::new(packages(2500).with_page_size(1000));

        let keys = collect_keys(&ns, ListOptions::new()).await.unwrap();

        assert_eq!(keys.len(), 2500);
        assert_eq!(ns.calls.load(Ordering::SeqCst), 3);
        let mut names: Vec<_> = keys.iter().map(|k| k.name.clone()).collect();
        names.dedup();
        assert_eq!(names.len(), 2500);
        assert_eq!(names.first().map(String::as_str), Some("pkg-00000"));
        assert_eq!(names.last().map(String::as_str), Some("pkg-02499"));
    }

    #[tokio::test]
    async fn test_empty_namespace_is_one_page() {
        let ns = Instrumented::new(InMemoryNamespace::new("empty"));
        let keys = collect_keys(&ns, ListOptions::new()).await.unwrap();
        assert!(keys.is_empty());
        assert_eq!(ns.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_prefix_is_forwarded_to_every_page() {
        let ns = InMemoryNamespace::new("versions").with_page_size(2);
        for v in ["1.0.0", "1.1.0", "2.0.0", "3.0.0", "3.1.0"] {
            ns.put(format!("react/{}", v), "{}");
        }
        ns.put("redux/1.0.0", "{}");

        let keys = collect_keys(&ns, ListOptions::new().with_prefix("react/"))
            .await
            .unwrap();
        assert_eq!(keys.len(), 5);
        assert!(keys.iter().all(|k| k.name.starts_with("react/")));
    }

    #[tokio::test]
    async fn test_page_failure_propagates_and_ends_stream() {
        let ns = Instrumented::new(packages(30).with_page_size(10)).failing_on(2);

        let results: Vec<_> = enumerate_keys(&ns, ListOptions::new()).collect().await;

        // First page arrives, then the failure, then nothing more.
        assert_eq!(results.len(), 11);
        assert!(results[..10].iter().all(|r| r.is_ok()));
        assert!(matches!(results[10], Err(KvError::Store { .. })));
        assert_eq!(ns.calls.load(Ordering::SeqCst), 2);

        let again = collect_keys(&ns, ListOptions::new()).await;
        assert!(again.is_ok(), "a fresh call starts a fresh cursor chain");
    }

    #[tokio::test]
    async fn test_fresh_call_restarts_enumeration() {
        let ns = packages(5).with_page_size(2);
        let first = collect_keys(&ns, ListOptions::new()).await.unwrap();
        let second = collect_keys(&ns, ListOptions::new()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_incoming_cursor_is_ignored() {
        let ns = packages(5).with_page_size(2);
        let options = ListOptions::new().with_cursor(crate::encode_cursor("pkg-00003"));
        let keys = collect_keys(&ns, options).await.unwrap();
        assert_eq!(keys.len(), 5);
    }

    #[tokio::test]
    async fn test_missing_cursor_is_an_error() {
        let results: Vec<_> = enumerate_keys(&Broken, ListOptions::new()).collect().await;
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(KvError::MissingCursor(_))));
    }

    #[tokio::test]
    async fn test_stream_is_lazy() {
        let ns = Instrumented::new(packages(30).with_page_size(10));
        let mut stream = enumerate_keys(&ns, ListOptions::new());
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.name, "pkg-00000");
        drop(stream);
        assert_eq!(ns.calls.load(Ordering::SeqCst), 1);
    }
}
