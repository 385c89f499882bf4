//! Locations and an in-memory session history.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::warn;
use url::{form_urlencoded, Url};

use crate::reactive::{Cleanup, Emitter};

const ORIGIN: &str = "http://localhost/";

/// The parts of a URL the router looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Always starts with `/`.
    pub pathname: String,
    /// Query without the `?`.
    pub search: String,
    /// Fragment without the `#`.
    pub hash: String,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            pathname: "/".to_string(),
            search: String::new(),
            hash: String::new(),
        }
    }
}

impl Location {
    /// Resolve `href` against the current origin. Relative references
    /// resolve against `/`.
    pub fn parse(href: &str) -> Self {
        match Url::parse(ORIGIN).and_then(|origin| origin.join(href)) {
            Ok(url) => Self {
                pathname: url.path().to_string(),
                search: url.query().unwrap_or_default().to_string(),
                hash: url.fragment().unwrap_or_default().to_string(),
            },
            Err(err) => {
                warn!(href, %err, "unparseable location, using /");
                Self::default()
            }
        }
    }

    pub fn href(&self) -> String {
        let mut href = self.pathname.clone();
        if !self.search.is_empty() {
            href.push('?');
            href.push_str(&self.search);
        }
        if !self.hash.is_empty() {
            href.push('#');
            href.push_str(&self.hash);
        }
        href
    }

    /// Decoded query pairs, in order.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        form_urlencoded::parse(self.search.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// First value of `name` in the query.
    pub fn query_param(&self, name: &str) -> Option<String> {
        form_urlencoded::parse(self.search.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.href())
    }
}

// ============================================================================
// MemoryHistory
// ============================================================================

struct HistoryInner {
    entries: RefCell<Vec<Location>>,
    index: Cell<usize>,
    popstate: Emitter<Location>,
}

/// A session history stack.
///
/// Like the browser's, `push` and `replace` do not fire popstate; moving
/// through the stack with `back`, `forward` or `go` does.
#[derive(Clone)]
pub struct MemoryHistory {
    inner: Rc<HistoryInner>,
}

impl MemoryHistory {
    pub fn new(initial: &str) -> Self {
        Self {
            inner: Rc::new(HistoryInner {
                entries: RefCell::new(vec![Location::parse(initial)]),
                index: Cell::new(0),
                popstate: Emitter::new(),
            }),
        }
    }

    pub fn location(&self) -> Location {
        self.inner.entries.borrow()[self.inner.index.get()].clone()
    }

    /// Add an entry after the current one, dropping any forward entries.
    pub fn push(&self, href: &str) -> Location {
        let location = Location::parse(href);
        let mut entries = self.inner.entries.borrow_mut();
        let index = self.inner.index.get();
        entries.truncate(index + 1);
        entries.push(location.clone());
        self.inner.index.set(index + 1);
        location
    }

    pub fn replace(&self, href: &str) -> Location {
        let location = Location::parse(href);
        self.inner.entries.borrow_mut()[self.inner.index.get()] = location.clone();
        location
    }

    pub fn back(&self) -> bool {
        self.go(-1)
    }

    pub fn forward(&self) -> bool {
        self.go(1)
    }

    /// Move `delta` entries. Returns false (and does nothing) when the target
    /// is out of range.
    pub fn go(&self, delta: isize) -> bool {
        if delta == 0 {
            return false;
        }
        let len = self.len();
        let Some(target) = self.inner.index.get().checked_add_signed(delta).filter(|t| *t < len) else {
            return false;
        };
        self.inner.index.set(target);
        let location = self.location();
        self.inner.popstate.emit(&location);
        true
    }

    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn index(&self) -> usize {
        self.inner.index.get()
    }

    pub fn on_popstate(&self, listener: impl Fn(&Location) + 'static) -> Cleanup {
        self.inner.popstate.subscribe(listener)
    }
}

impl fmt::Debug for MemoryHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryHistory")
            .field("entries", &*self.inner.entries.borrow())
            .field("index", &self.inner.index.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_location_parse() {
        let location = Location::parse("/shop/product/42?search=a%20b&current=2#top");
        assert_eq!(location.pathname, "/shop/product/42");
        assert_eq!(location.search, "search=a%20b&current=2");
        assert_eq!(location.hash, "top");
        assert_eq!(location.query_param("search").as_deref(), Some("a b"));
        assert_eq!(location.href(), "/shop/product/42?search=a%20b&current=2#top");

        assert_eq!(Location::parse("cart").pathname, "/cart");
        assert_eq!(Location::parse("").pathname, "/");
        assert_eq!(Location::parse("/a/../b").pathname, "/b");
    }

    #[test]
    fn test_push_replace_do_not_fire_popstate() {
        let history = MemoryHistory::new("/");
        let fired = Rc::new(Cell::new(0));
        let tally = fired.clone();
        let _sub = history.on_popstate(move |_| tally.set(tally.get() + 1));

        history.push("/cart");
        history.replace("/cart?x=1");
        assert_eq!(fired.get(), 0);
        assert_eq!(history.len(), 2);
        assert_eq!(history.location().href(), "/cart?x=1");
    }

    #[test]
    fn test_back_forward() {
        let history = MemoryHistory::new("/");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let _sub = history.on_popstate(move |l| sink.borrow_mut().push(l.pathname.clone()));

        history.push("/a");
        history.push("/b");
        assert!(history.back());
        assert!(history.back());
        assert!(!history.back());
        assert!(history.forward());

        // Pushing drops the forward entries.
        history.push("/c");
        assert!(!history.forward());
        assert_eq!(history.len(), 3);

        assert_eq!(*seen.borrow(), vec!["/a", "/", "/a"]);
        assert!(!history.go(0));
    }
}
