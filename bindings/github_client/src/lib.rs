mod client;
mod error;
mod types;

pub mod prelude {
    pub use crate::client::GithubClient;
    pub use crate::error::{GithubClientError, GithubResult};
    pub use crate::types::{
        BranchInfo, CommitInfo, CommitListItem, ContentInfo, DeleteContentResponse, GitRef,
        PutContentResponse,
    };
}
