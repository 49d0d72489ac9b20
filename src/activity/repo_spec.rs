use crate::Result;
use core::fmt::{Display, Formatter};
use ohno::bail;
use url::Url;

/// Identifies one repository by owner and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoSpec {
    owner: String,
    repo: String,
}

impl RepoSpec {
    /// Parse a repository reference, accepting either `owner/repo` or a full
    /// URL such as `https://github.com/owner/repo`.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        if let Ok(url) = Url::parse(input) {
            let mut segments = url
                .path_segments()
                .map(Iterator::collect::<Vec<_>>)
                .unwrap_or_default()
                .into_iter()
                .filter(|s| !s.is_empty());

            if let (Some(owner), Some(repo)) = (segments.next(), segments.next()) {
                return Ok(Self {
                    owner: owner.to_string(),
                    repo: repo.trim_end_matches(".git").to_string(),
                });
            }

            bail!("repository URL `{input}` has no owner/repo path");
        }

        match input.split('/').collect::<Vec<_>>().as_slice() {
            [owner, repo] if !owner.is_empty() && !repo.is_empty() => Ok(Self {
                owner: (*owner).to_string(),
                repo: repo.trim_end_matches(".git").to_string(),
            }),
            _ => bail!("`{input}` is not a valid repository reference, expected `owner/repo` or a repository URL"),
        }
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn repo(&self) -> &str {
        &self.repo
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl Display for RepoSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
