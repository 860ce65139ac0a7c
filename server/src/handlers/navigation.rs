//! Navigation path lookup.

use crate::backend::FlexdexBackend;
use crate::error::ServerResult;
use flexdex_core::{find_path, render_snippet, PathStep};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct GetNavigationPathParams {
    pub from_object: String,
    pub to_object: String,
}

#[derive(Debug, Serialize)]
pub struct NavigationPathResponse {
    /// Resolved entity ids
    pub from: String,
    pub to: String,
    pub hops: usize,
    pub steps: Vec<PathStep>,
    /// Traversal code for the path; empty when `from == to`
    pub snippet: String,
}

impl FlexdexBackend {
    /// Shortest relationship path between two entities. Both names go through
    /// the same loose resolution as `get_object_api`.
    pub fn handle_get_navigation_path(
        &self,
        params: GetNavigationPathParams,
    ) -> ServerResult<NavigationPathResponse> {
        let snapshot = self.snapshot();
        let from = snapshot.resolve(&params.from_object)?.id.clone();
        let to = snapshot.resolve(&params.to_object)?.id.clone();

        let path = find_path(&snapshot, &from, &to)?;
        let snippet = render_snippet(&path);
        Ok(NavigationPathResponse {
            from,
            to,
            hops: path.len(),
            steps: path.steps,
            snippet,
        })
    }
}
