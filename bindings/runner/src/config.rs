/// Environment variables the probe is configured from.
pub const ENV_GITHUB_OWNER: &str = "PROBE_GITHUB_OWNER";
pub const ENV_GITHUB_REPO: &str = "PROBE_GITHUB_REPO";
pub const ENV_GITHUB_TOKEN: &str = "PROBE_GITHUB_TOKEN";
pub const ENV_GITHUB_API_URL: &str = "PROBE_GITHUB_API_URL";
pub const ENV_DEFAULT_BRANCH: &str = "PROBE_DEFAULT_BRANCH";
pub const ENV_CMS_CONTENT_URL: &str = "PROBE_CMS_CONTENT_URL";
pub const ENV_CMS_QUERY_URL: &str = "PROBE_CMS_QUERY_URL";
pub const ENV_CONTENT_PATH: &str = "PROBE_CONTENT_PATH";

const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_BRANCH: &str = "main";
const DEFAULT_CONTENT_PATH: &str = "README.md";

/// Configuration for one probe run, sourced from the environment.
///
/// Optional fields stay `None` when unset; which of them a scenario actually needs is decided
/// by the scenario, so a partially configured environment can still run partial scenarios.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub github_owner: Option<String>,
    pub github_repo: Option<String>,
    pub github_token: Option<String>,
    pub github_api_url: String,
    pub default_branch: String,
    pub cms_content_url: Option<String>,
    pub cms_query_url: Option<String>,
    /// The repository file the read-comparison scenarios fetch
    pub content_path: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            github_owner: None,
            github_repo: None,
            github_token: None,
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            default_branch: DEFAULT_BRANCH.to_string(),
            cms_content_url: None,
            cms_query_url: None,
            content_path: DEFAULT_CONTENT_PATH.to_string(),
        }
    }
}

impl ProbeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary lookup, so tests don't have to mutate the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());

        Self {
            github_owner: non_empty(ENV_GITHUB_OWNER),
            github_repo: non_empty(ENV_GITHUB_REPO),
            github_token: non_empty(ENV_GITHUB_TOKEN),
            github_api_url: non_empty(ENV_GITHUB_API_URL)
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
            default_branch: non_empty(ENV_DEFAULT_BRANCH)
                .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            cms_content_url: non_empty(ENV_CMS_CONTENT_URL),
            cms_query_url: non_empty(ENV_CMS_QUERY_URL),
            content_path: non_empty(ENV_CONTENT_PATH)
                .unwrap_or_else(|| DEFAULT_CONTENT_PATH.to_string()),
        }
    }

    /// Check which of the configurable fields are present.
    pub fn checklist(&self) -> PrerequisiteChecklist {
        let mut missing = Vec::new();
        for (key, present) in [
            (ENV_GITHUB_OWNER, self.github_owner.is_some()),
            (ENV_GITHUB_REPO, self.github_repo.is_some()),
            (ENV_GITHUB_TOKEN, self.github_token.is_some()),
            (ENV_CMS_CONTENT_URL, self.cms_content_url.is_some()),
            (ENV_CMS_QUERY_URL, self.cms_query_url.is_some()),
        ] {
            if !present {
                missing.push(key);
            }
        }

        PrerequisiteChecklist { missing }
    }
}

/// The outcome of the startup prerequisite check.
///
/// A missing field is reported, not fatal: some scenarios can run partially without it, and
/// the checklist tells the user exactly what to set for the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrerequisiteChecklist {
    pub missing: Vec<&'static str>,
}

impl PrerequisiteChecklist {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// One line per required field, checklist style.
    pub fn report(&self) -> String {
        [
            ENV_GITHUB_OWNER,
            ENV_GITHUB_REPO,
            ENV_GITHUB_TOKEN,
            ENV_CMS_CONTENT_URL,
            ENV_CMS_QUERY_URL,
        ]
        .iter()
        .map(|key| {
            if self.missing.contains(key) {
                format!("✘ {key} (missing)")
            } else {
                format!("✔ {key}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = ProbeConfig::from_lookup(|_| None);

        assert_eq!(None, config.github_owner);
        assert_eq!("https://api.github.com", config.github_api_url);
        assert_eq!("main", config.default_branch);
        assert_eq!("README.md", config.content_path);
    }

    #[test]
    fn empty_values_count_as_missing() {
        let config = ProbeConfig::from_lookup(lookup_from(&[
            (ENV_GITHUB_OWNER, "acme"),
            (ENV_GITHUB_REPO, ""),
        ]));

        assert_eq!(Some("acme".to_string()), config.github_owner);
        assert_eq!(None, config.github_repo);
    }

    #[test]
    fn checklist_names_every_missing_field() {
        let config = ProbeConfig::from_lookup(lookup_from(&[
            (ENV_GITHUB_OWNER, "acme"),
            (ENV_GITHUB_REPO, "site"),
            (ENV_GITHUB_TOKEN, "token123"),
        ]));

        let checklist = config.checklist();
        assert!(!checklist.is_complete());
        assert_eq!(
            vec![ENV_CMS_CONTENT_URL, ENV_CMS_QUERY_URL],
            checklist.missing
        );

        let report = checklist.report();
        assert!(report.contains("✔ PROBE_GITHUB_OWNER"));
        assert!(report.contains("✘ PROBE_CMS_CONTENT_URL (missing)"));
    }

    #[test]
    fn fully_configured_checklist_is_complete() {
        let config = ProbeConfig::from_lookup(lookup_from(&[
            (ENV_GITHUB_OWNER, "acme"),
            (ENV_GITHUB_REPO, "site"),
            (ENV_GITHUB_TOKEN, "token123"),
            (ENV_CMS_CONTENT_URL, "http://localhost:4001/content"),
            (ENV_CMS_QUERY_URL, "http://localhost:4001/graphql"),
        ]));

        assert!(config.checklist().is_complete());
    }
}
