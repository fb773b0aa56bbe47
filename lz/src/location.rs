//! Page URL state shared by every coordinator on the page
//!
//! The `section` query parameter is read once per coordinator mount to honor
//! a deep link, and rewritten in place whenever the active section changes.
//! Rewrites never navigate and never add a history entry; the last writer
//! wins.

use std::sync::Mutex;

use tracing::debug;
use url::Url;

/// Query parameter naming the active section
pub const SECTION_PARAM: &str = "section";

/// Read/replace access to the page's `section` parameter
pub trait UrlState: Send + Sync {
    /// Current value of the `section` parameter
    fn section(&self) -> Option<String>;

    /// Replace the `section` parameter in place
    fn replace_section(&self, section: &str);
}

#[derive(Debug)]
struct PageUrlInner {
    url: Url,
    replacements: usize,
}

/// In-memory page URL
#[derive(Debug)]
pub struct PageUrl {
    inner: Mutex<PageUrlInner>,
}

impl PageUrl {
    pub fn new(url: Url) -> Self {
        Self {
            inner: Mutex::new(PageUrlInner { url, replacements: 0 }),
        }
    }

    pub fn parse(input: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(Url::parse(input)?))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PageUrlInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Full URL as a string
    pub fn href(&self) -> String {
        self.lock().url.to_string()
    }

    /// Number of in-place rewrites so far
    pub fn replacements(&self) -> usize {
        self.lock().replacements
    }
}

impl UrlState for PageUrl {
    fn section(&self) -> Option<String> {
        self.lock()
            .url
            .query_pairs()
            .find(|(k, _)| k == SECTION_PARAM)
            .map(|(_, v)| v.into_owned())
    }

    fn replace_section(&self, section: &str) {
        let mut inner = self.lock();
        let mut replaced = false;
        let pairs: Vec<(String, String)> = inner
            .url
            .query_pairs()
            .filter_map(|(k, v)| {
                if k != SECTION_PARAM {
                    return Some((k.into_owned(), v.into_owned()));
                }
                if replaced {
                    return None;
                }
                replaced = true;
                Some((k.into_owned(), section.to_string()))
            })
            .collect();

        {
            let mut query = inner.url.query_pairs_mut();
            query.clear();
            query.extend_pairs(&pairs);
            if !replaced {
                query.append_pair(SECTION_PARAM, section);
            }
        }
        inner.replacements += 1;
        debug!(%section, url = %inner.url, "PageUrl::replace_section");
    }
}
