use crate::config::{
    ProbeConfig, ENV_CONTENT_PATH, ENV_DEFAULT_BRANCH, ENV_GITHUB_OWNER, ENV_GITHUB_REPO,
};
use crate::context::GithubProbeContext;
use crate::resources::TransientResource;
use cms_probe_client::prelude::CmsClient;
use github_probe_client::prelude::GithubClient;
use propagation_probe_runner::prelude::{
    HookResult, StepBailError, StepContext, UserValuesConstraint,
};

/// Load the configuration from the environment, report the prerequisite checklist and
/// construct whichever backend clients are configured.
///
/// Missing fields are reported and the matching client stays unset, so scenarios that only
/// need one backend still run. A field that is present but unusable is fatal: when no backend
/// call can be constructed from it there is nothing left to measure.
pub fn configure_clients<SV: UserValuesConstraint>(
    ctx: &mut StepContext<GithubProbeContext<SV>>,
) -> HookResult {
    let config = ProbeConfig::from_env();

    let checklist = config.checklist();
    if checklist.is_complete() {
        log::info!("All probe prerequisites are configured");
    } else {
        log::warn!(
            "Some probe prerequisites are missing, scenarios may run partially:\n{}",
            checklist.report()
        );
    }

    // Non-secret values only; the token never reaches the report.
    if let Some(owner) = &config.github_owner {
        ctx.add_env(ENV_GITHUB_OWNER, owner);
    }
    if let Some(repo) = &config.github_repo {
        ctx.add_env(ENV_GITHUB_REPO, repo);
    }
    ctx.add_env(ENV_DEFAULT_BRANCH, &config.default_branch);
    ctx.add_env(ENV_CONTENT_PATH, &config.content_path);

    let github = match (&config.github_owner, &config.github_repo) {
        (Some(owner), Some(repo)) => Some(
            GithubClient::new(
                &config.github_api_url,
                owner,
                repo,
                config.github_token.as_deref().unwrap_or(""),
            )
            .map_err(|e| StepBailError::new(format!("cannot construct the REST client: {e}")))?,
        ),
        _ => None,
    };

    let cms = match (&config.cms_content_url, &config.cms_query_url) {
        (Some(content_url), Some(query_url)) => Some(
            CmsClient::new(content_url, query_url)
                .map_err(|e| StepBailError::new(format!("cannot construct the CMS client: {e}")))?,
        ),
        _ => None,
    };

    let values = ctx.get_mut();
    values.config = config;
    values.github = github;
    values.cms = cms;

    Ok(())
}

/// The REST client, or a bail when the repository half of the configuration is absent.
pub fn require_github<SV: UserValuesConstraint>(
    ctx: &StepContext<GithubProbeContext<SV>>,
) -> anyhow::Result<GithubClient> {
    ctx.get().github.clone().ok_or_else(|| {
        anyhow::Error::new(StepBailError::new(
            "the REST client is not configured; set PROBE_GITHUB_OWNER and PROBE_GITHUB_REPO",
        ))
    })
}

/// The CMS client, or a bail when the CMS half of the configuration is absent.
pub fn require_cms<SV: UserValuesConstraint>(
    ctx: &StepContext<GithubProbeContext<SV>>,
) -> anyhow::Result<CmsClient> {
    ctx.get().cms.clone().ok_or_else(|| {
        anyhow::Error::new(StepBailError::new(
            "the CMS client is not configured; set PROBE_CMS_CONTENT_URL and PROBE_CMS_QUERY_URL",
        ))
    })
}

/// Bail unless an access token is configured. Scenarios that create commits and branches call
/// this in their setup hook, since without write access none of their steps can do anything.
pub fn require_write_access<SV: UserValuesConstraint>(
    ctx: &StepContext<GithubProbeContext<SV>>,
) -> anyhow::Result<()> {
    if ctx.get().config.github_token.is_none() {
        anyhow::bail!(StepBailError::new(
            "write scenarios need an access token; set PROBE_GITHUB_TOKEN"
        ));
    }
    Ok(())
}

/// Create a uniquely named branch off the default branch head and track it for cleanup.
///
/// Returns `None` when either backend call failed; the failure is already recorded against the
/// current step and the scenario decides how to continue.
pub fn create_probe_branch<SV: UserValuesConstraint>(
    ctx: &mut StepContext<GithubProbeContext<SV>>,
    prefix: &str,
) -> anyhow::Result<Option<String>> {
    let github = require_github(ctx)?;
    let default_branch = ctx.get().config.default_branch.clone();

    let head = {
        let github = github.clone();
        let branch = default_branch.clone();
        ctx.timed("github_get_branch_ref", async move {
            Ok(github.get_branch_ref(&branch).await?)
        })?
    };
    let Some(head) = head else {
        return Ok(None);
    };

    let name = ctx.unique_name(prefix);
    let created = {
        let github = github.clone();
        let name = name.clone();
        let sha = head.object.sha.clone();
        ctx.timed("github_create_branch_ref", async move {
            Ok(github.create_branch_ref(&name, &sha).await?)
        })?
    };
    if created.is_none() {
        return Ok(None);
    }

    ctx.get_mut()
        .resources
        .push(TransientResource::branch(name.clone()));
    log::info!("Created probe branch {name}");
    Ok(Some(name))
}

/// A file committed by [commit_probe_file].
#[derive(Debug, Clone)]
pub struct ProbeFile {
    pub path: String,
    pub commit_sha: String,
    /// A unique line inside the body; reads prove freshness by finding it
    pub marker: String,
}

/// Commit a uniquely named file to `branch` in a single commit and track it for cleanup.
pub fn commit_probe_file<SV: UserValuesConstraint>(
    ctx: &mut StepContext<GithubProbeContext<SV>>,
    branch: &str,
) -> anyhow::Result<Option<ProbeFile>> {
    let github = require_github(ctx)?;

    let name = ctx.unique_name("data");
    let path = format!("probe/{name}.md");
    let marker = format!("propagation-probe payload {name}");
    let body = format!("# Probe data\n\n{marker}\n");
    let message = format!("probe: add {path}");

    let response = {
        let github = github.clone();
        let path = path.clone();
        let branch = branch.to_string();
        ctx.timed("github_put_content", async move {
            Ok(github.put_content(&path, &message, &body, &branch).await?)
        })?
    };
    let Some(response) = response else {
        return Ok(None);
    };

    ctx.get_mut()
        .resources
        .push(TransientResource::file(branch, &path, &response.content.sha));
    log::info!("Committed probe file {path} to {branch}");
    Ok(Some(ProbeFile {
        path,
        commit_sha: response.commit.sha,
        marker,
    }))
}

/// Delete every tracked transient resource, newest first, so files go before the branches
/// carrying them. Failures are warnings: the resource may already be gone, and cleanup never
/// affects a scenario's verdict. One deletion attempt is recorded per resource.
pub fn cleanup_transient_resources<SV: UserValuesConstraint>(
    ctx: &mut StepContext<GithubProbeContext<SV>>,
) -> HookResult {
    let resources = std::mem::take(&mut ctx.get_mut().resources);
    if resources.is_empty() {
        log::info!("No transient resources to clean up");
        return Ok(());
    }

    let github = match ctx.get().github.clone() {
        Some(github) => github,
        None => {
            log::warn!(
                "Cannot clean up {} transient resources: the REST client is unavailable",
                resources.len()
            );
            return Ok(());
        }
    };

    for resource in resources.into_iter().rev() {
        let description = resource.describe();
        let deleted = match resource {
            TransientResource::Branch { name, .. } => {
                let github = github.clone();
                ctx.timed("github_delete_branch_ref", async move {
                    Ok(github.delete_branch_ref(&name).await?)
                })?
            }
            TransientResource::File {
                branch, path, sha, ..
            } => {
                let github = github.clone();
                ctx.timed("github_delete_content", async move {
                    let message = format!("probe: remove {path}");
                    github.delete_content(&path, &message, &sha, &branch).await?;
                    Ok(())
                })?
            }
        };

        match deleted {
            Some(()) => log::info!("Cleaned up {description}"),
            None => log::warn!("Cleanup failed for {description}, it may already be gone"),
        }
    }

    Ok(())
}
