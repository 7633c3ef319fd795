//! Navigation seam used for authorization redirects.

use parking_lot::Mutex;
use url::form_urlencoded;

/// A request to move the user to another location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub path: String,
    /// Where to return after signing in.
    pub return_url: Option<String>,
}

impl Redirect {
    /// `path?returnUrl=<encoded>` form of the redirect.
    pub fn location(&self) -> String {
        match &self.return_url {
            Some(ret) => {
                let query = form_urlencoded::Serializer::new(String::new())
                    .append_pair("returnUrl", ret)
                    .finish();
                format!("{}?{query}", self.path)
            }
            None => self.path.clone(),
        }
    }
}

/// The application's router.
pub trait Navigator: Send + Sync {
    /// Location the user is currently at.
    fn current_location(&self) -> String;

    /// Move to another location. Must not block.
    fn navigate(&self, redirect: Redirect);
}

/// Navigator that records every redirect and moves its current location.
#[derive(Debug)]
pub struct RecordingNavigator {
    location: Mutex<String>,
    redirects: Mutex<Vec<Redirect>>,
}

impl Default for RecordingNavigator {
    fn default() -> Self {
        Self::at("/")
    }
}

impl RecordingNavigator {
    pub fn at(location: impl Into<String>) -> Self {
        Self {
            location: Mutex::new(location.into()),
            redirects: Mutex::new(Vec::new()),
        }
    }

    pub fn set_location(&self, location: impl Into<String>) {
        *self.location.lock() = location.into();
    }

    pub fn redirects(&self) -> Vec<Redirect> {
        self.redirects.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_location(&self) -> String {
        self.location.lock().clone()
    }

    fn navigate(&self, redirect: Redirect) {
        *self.location.lock() = redirect.location();
        self.redirects.lock().push(redirect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_url_is_query_encoded() {
        let redirect = Redirect {
            path: "/login".into(),
            return_url: Some("/orders?tab=2&x=a b".into()),
        };
        assert_eq!(redirect.location(), "/login?returnUrl=%2Forders%3Ftab%3D2%26x%3Da+b");
    }

    #[test]
    fn recording_navigator_moves_and_logs() {
        let nav = RecordingNavigator::at("/orders");
        nav.navigate(Redirect {
            path: "/login".into(),
            return_url: Some(nav.current_location()),
        });
        assert_eq!(nav.current_location(), "/login?returnUrl=%2Forders");
        assert_eq!(nav.redirects().len(), 1);
    }
}
