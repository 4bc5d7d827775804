//! The generated `params_info.html` document.

use std::io;
use std::path::{Path, PathBuf};

use tokio::sync::{RwLock, RwLockReadGuard};

use crate::params::query::Params;
use crate::params::render::render_params_page;
use crate::params::store::ParameterStore;

/// File name of the generated page inside the document root.
pub const PARAMS_PAGE_FILE: &str = "params_info.html";

/// Request path that triggers regeneration on POST.
pub const PARAMS_PAGE_PATH: &str = "/params_info.html";

/// Owner of the on-disk parameter page.
///
/// Regeneration (store append, render, write) runs under the write lock;
/// serving the file runs under the read lock, so a reader never sees a
/// half-written page.
#[derive(Debug)]
pub struct ParamsPage {
    path: PathBuf,
    lock: RwLock<()>,
}

impl ParamsPage {
    /// Page stored in `root`.
    pub fn new(root: &Path) -> Self {
        Self {
            path: root.join(PARAMS_PAGE_FILE),
            lock: RwLock::new(()),
        }
    }

    /// Whether `path` is the generated page.
    pub fn is_page(&self, path: &Path) -> bool {
        path == self.path
    }

    /// Append `params`, regenerate the page from the whole store, persist it
    /// and return its bytes.
    pub async fn store_and_render(
        &self,
        store: &ParameterStore,
        params: &Params,
    ) -> io::Result<Vec<u8>> {
        let _guard = self.lock.write().await;

        store.append(params);
        let html = render_params_page(&store.snapshot()).into_bytes();
        tokio::fs::write(&self.path, &html).await?;

        tracing::info!(
            path = %self.path.display(),
            bytes = html.len(),
            "Parameter page regenerated"
        );
        Ok(html)
    }

    /// Hold while reading the page from disk.
    pub async fn read_lock(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn regenerates_from_whole_store() {
        let dir = tempfile::tempdir().unwrap();
        let page = ParamsPage::new(dir.path());
        let store = ParameterStore::new();

        page.store_and_render(&store, &Params::from_query("name=alice"))
            .await
            .unwrap();
        let html = page
            .store_and_render(&store, &Params::from_query("name=bob"))
            .await
            .unwrap();

        let on_disk = std::fs::read(dir.path().join(PARAMS_PAGE_FILE)).unwrap();
        assert_eq!(on_disk, html);
        let html = String::from_utf8(html).unwrap();
        assert!(html.contains("<td>alice</td>") && html.contains("<td>bob</td>"));
        assert!(page.is_page(&dir.path().join("params_info.html")));
    }

    #[tokio::test]
    async fn write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let page = ParamsPage::new(&dir.path().join("missing-dir"));
        let store = ParameterStore::new();

        let result = page
            .store_and_render(&store, &Params::from_query("a=1"))
            .await;
        assert!(result.is_err());
        // The parameters were still recorded
        assert_eq!(store.values("a"), ["1"]);
    }
}
