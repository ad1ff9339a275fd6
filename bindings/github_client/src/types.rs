use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct GitObject {
    pub sha: String,
}

/// A git reference as returned by the `git/ref` endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub full_ref: String,
    pub object: GitObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BranchCommit {
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BranchInfo {
    pub name: String,
    pub commit: BranchCommit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitInfo {
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitListItem {
    pub sha: String,
}

/// Metadata for a file in the repository, without its body.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentInfo {
    pub path: String,
    pub sha: String,
}

/// Response to creating or updating a file through the contents endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PutContentResponse {
    pub content: ContentInfo,
    pub commit: CommitInfo,
}

/// Response to deleting a file; `content` is null there, only the commit matters.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteContentResponse {
    pub commit: CommitInfo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn git_ref_decodes_the_ref_keyword_field() {
        let json = r#"{
            "ref": "refs/heads/probe-branch-1714650000000",
            "node_id": "REF_kwDOAJy2Ks5yb3JlLXByb2Jl",
            "url": "https://api.github.com/repos/acme/site/git/refs/heads/probe-branch-1714650000000",
            "object": {
                "sha": "aa218f56b14c9653891f9e74264a383fa43fefbd",
                "type": "commit",
                "url": "https://api.github.com/repos/acme/site/git/commits/aa218f56b14c9653891f9e74264a383fa43fefbd"
            }
        }"#;

        let git_ref: GitRef = serde_json::from_str(json).unwrap();
        assert_eq!("refs/heads/probe-branch-1714650000000", git_ref.full_ref);
        assert_eq!("aa218f56b14c9653891f9e74264a383fa43fefbd", git_ref.object.sha);
    }

    #[test]
    fn put_content_response_keeps_both_shas() {
        let json = r#"{
            "content": {
                "name": "data-1714650000000.md",
                "path": "probe/data-1714650000000.md",
                "sha": "95b966ae1c166bd92f8ae7d1c313e738c731dfc3",
                "size": 42
            },
            "commit": {
                "sha": "7638417db6d59f3c431d3e1f261cc637155684cd",
                "message": "probe: add data-1714650000000.md"
            }
        }"#;

        let response: PutContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!("probe/data-1714650000000.md", response.content.path);
        assert_eq!("7638417db6d59f3c431d3e1f261cc637155684cd", response.commit.sha);
    }
}
