//! Proposal listing filters.
//!
//! Only the keys below are recognized; anything else in the query string is
//! ignored. Every value is sent as a bind parameter.
//!
//! | key           | condition                              |
//! |---------------|----------------------------------------|
//! | `category`    | `P.CATEGORY = v`                       |
//! | `archive`     | `P.ARCHIVE = v` (present even if empty)|
//! | `stage`       | `P.STAGE = v`                          |
//! | `stage_in`    | `P.STAGE IN (v1, v2, ...)` (repeatable)|
//! | `status`      | `P.STATUS = v`                         |
//! | `client_name` | `O.ORG_FULL_NAME = v`                  |
//! | `prime`       | `P.PRIME = v` (whole stored string)    |
//! | `sub_like`    | `P.SUB LIKE '%v%'`                     |

use crate::db::{QueryBuilder, Statement};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProposalFilter {
    pub category: Option<String>,
    pub archive: Option<String>,
    pub stage: Option<String>,
    pub stage_in: Vec<String>,
    pub status: Option<String>,
    pub client_name: Option<String>,
    pub prime: Option<String>,
    pub sub_like: Option<String>,
}

/// Proposals joined with their client organization, as listed and fetched
/// by id.
pub fn proposal_select(proposals: &str, organizations: &str) -> String {
    format!(
        "SELECT P.*, O.\"ORG_FULL_NAME\" AS \"CLIENT_NAME\", O.\"ORG_TYPE\" AS \"ORG_TYPE\" \
         FROM {proposals} P LEFT JOIN {organizations} O ON P.\"ORG_ID\" = O.\"ORG_ID\""
    )
}

impl ProposalFilter {
    /// Reads recognized keys from decoded query pairs. Keys may be lower or
    /// upper case; a non-empty lower-case value wins, otherwise a non-empty
    /// upper-case one is used.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let pairs: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.into()))
            .collect();

        let first = |name: &str| -> Option<String> {
            let upper = name.to_ascii_uppercase();
            let find = |key: &str| pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone());
            let lower = find(name);
            match lower {
                Some(v) if !v.is_empty() => Some(v),
                _ => find(&upper).filter(|v| !v.is_empty()).or(lower),
            }
        };
        let non_empty = |name: &str| first(name).filter(|v| !v.is_empty());

        let collect_all = |name: &str| -> Vec<String> {
            pairs
                .iter()
                .filter(|(k, v)| k == name && !v.is_empty())
                .map(|(_, v)| v.clone())
                .collect()
        };
        let mut stage_in = collect_all("stage_in");
        if stage_in.is_empty() {
            stage_in = collect_all("STAGE_IN");
        }

        Self {
            category: non_empty("category"),
            archive: first("archive"),
            stage: non_empty("stage"),
            stage_in,
            status: non_empty("status"),
            client_name: non_empty("client_name"),
            prime: non_empty("prime"),
            sub_like: non_empty("sub_like"),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Builds the listing query. All filters combine with AND; ordering is
    /// always by organization type, then title.
    pub fn to_statement(&self, proposals: &str, organizations: &str) -> Statement {
        let mut qb = QueryBuilder::new(proposal_select(proposals, organizations));
        qb.push(" WHERE 1=1");

        if let Some(category) = &self.category {
            qb.push(" AND P.\"CATEGORY\" = ").push_bind(category.as_str());
        }
        if let Some(archive) = &self.archive {
            qb.push(" AND P.\"ARCHIVE\" = ").push_bind(archive.as_str());
        }
        if let Some(stage) = &self.stage {
            qb.push(" AND P.\"STAGE\" = ").push_bind(stage.as_str());
        }
        if !self.stage_in.is_empty() {
            let placeholders: Vec<String> = self
                .stage_in
                .iter()
                .map(|stage| qb.bind(Some(stage.clone())))
                .collect();
            qb.push(&format!(" AND P.\"STAGE\" IN ({})", placeholders.join(", ")));
        }
        if let Some(status) = &self.status {
            qb.push(" AND P.\"STATUS\" = ").push_bind(status.as_str());
        }
        if let Some(client_name) = &self.client_name {
            qb.push(" AND O.\"ORG_FULL_NAME\" = ").push_bind(client_name.as_str());
        }
        if let Some(prime) = &self.prime {
            qb.push(" AND P.\"PRIME\" = ").push_bind(prime.as_str());
        }
        if let Some(sub) = &self.sub_like {
            qb.push(" AND P.\"SUB\" LIKE ").push_bind(format!("%{sub}%"));
        }

        qb.push(" ORDER BY O.\"ORG_TYPE\", P.\"TITLE\"");
        qb.finish()
    }
}
