use super::{Middleware, Output};
use crate::error::{Abort, WaypointError};
use crate::router::Route;
use crate::{Request, Response};
use std::path::{Path, PathBuf};
use std::pin::Pin;

/// Serves the files under `base` at `prefix`.
///
/// This is a `GET` route on `prefix/**`; the captured segments are joined
/// onto `base`.  A request for a file that does not exist, or that tries to
/// climb out of `base` (with `..`), is answered with a `404`.
///
/// # Panics
/// Panics if `prefix` is not a valid route template.
///
/// # Examples
/// ```rust
/// # use waypoint::*;
/// # #[tokio::main] async fn main() -> Result<(), anyhow::Error> {
/// let mut router = waypoint::router();
/// router.with(middleware::dir("/src", env!("CARGO_MANIFEST_DIR")));
/// let response = router.handle(Request::get("/src/Cargo.toml")?).await;
/// assert_eq!(response.status(), http::StatusCode::OK);
/// let response = router.handle(Request::get("/src/nothing-here.txt")?).await;
/// assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
/// # Ok(())
/// # }
/// ```
pub fn dir<P: Into<PathBuf>>(prefix: &str, base: P) -> Route {
    let template = format!("{}/**", prefix.trim_end_matches('/'));
    Route::new(
        Some(http::Method::GET),
        template.as_str(),
        DirHandler { base: base.into() },
    )
}

#[derive(Debug, Clone)]
struct DirHandler {
    base: PathBuf,
}

#[async_trait]
impl Middleware for DirHandler {
    async fn apply(
        self: Pin<&Self>,
        request: &mut Request,
        _response: &mut Response,
    ) -> Result<Output, anyhow::Error> {
        match resolve_path(request.parameters().wildcards(), &self.base) {
            Some(path) => Ok(Output::File(path)),
            None => Err(Abort::from(WaypointError::AssetNotFound).into()),
        }
    }
}

fn resolve_path(segments: &[String], base: &Path) -> Option<PathBuf> {
    log::trace!("resolve_path({:?}, {:?})", segments, base);
    let mut buffer = base.to_path_buf();
    for segment in segments {
        if segment == ".." || segment.contains(['/', '\\']) {
            return None;
        }
        if segment != "." {
            buffer.push(segment);
        }
    }
    log::trace!("resolve_path={:?}", buffer);
    Some(buffer)
}

#[cfg(test)]
mod test {
    use super::*;

    fn segments(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn test_resolve_path() {
        let base = Path::new("/srv/public");
        assert_eq!(
            resolve_path(&segments(&["css", "site.css"]), base),
            Some(PathBuf::from("/srv/public/css/site.css"))
        );
        assert_eq!(
            resolve_path(&segments(&[".", "a.txt"]), base),
            Some(PathBuf::from("/srv/public/a.txt"))
        );
        assert_eq!(resolve_path(&segments(&["..", "etc", "passwd"]), base), None);
        assert_eq!(resolve_path(&segments(&["a", "..", "..", "b"]), base), None);
        assert_eq!(resolve_path(&segments(&["a/../b"]), base), None);
        assert_eq!(resolve_path(&segments(&["..\\x"]), base), None);
    }
}
