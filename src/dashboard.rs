use crate::tables::{
    CATEGORY_FEE_PROPOSAL, CATEGORY_PROPOSAL_SUBMITTED, CATEGORY_PURSUITS, CONTRACT_STAGES,
    STAGE_AE_SELECTED, STAGE_MULTI_USE, STAGE_SINGLE_USE, STATUS_AWARDED,
};
use serde::{Deserialize, Serialize};

/// The proposal columns the dashboard needs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct CountRow {
    pub category: Option<String>,
    pub archive: Option<String>,
    pub stage: Option<String>,
    pub status: Option<String>,
    pub prime: Option<String>,
    pub sub: Option<String>,
}

impl CountRow {
    fn is(&self, category: &str, archived: bool) -> bool {
        self.category.as_deref() == Some(category)
            && self.archive.as_deref() == Some(if archived { "Y" } else { "N" })
    }

    fn stage_is(&self, stage: &str) -> bool {
        self.stage.as_deref() == Some(stage)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProposalCounts {
    pub future_pursuits: usize,
    pub archived_pursuits: usize,
    pub active_proposals: usize,
    pub archived_proposals: usize,
    pub active_prime_multiuse: usize,
    pub active_sub_multiuse: usize,
    pub archived_prime_multiuse: usize,
    pub archived_sub_multiuse: usize,
    #[serde(rename = "activeAESelected")]
    pub active_ae_selected: usize,
    #[serde(rename = "archivedAESelected")]
    pub archived_ae_selected: usize,
    pub active_single_use: usize,
    pub archived_single_use: usize,
    pub active_fee_proposals: usize,
    pub archived_fee_proposals: usize,
    pub project_avenue: usize,
}

/// Tallies the dashboard cards in one pass. `home_company` is matched exactly
/// against PRIME and as a substring of SUB.
pub fn count_proposals(rows: &[CountRow], home_company: &str) -> ProposalCounts {
    let mut counts = ProposalCounts::default();

    for row in rows {
        let is_prime = row.prime.as_deref() == Some(home_company);
        let is_sub = row
            .sub
            .as_deref()
            .is_some_and(|sub| sub.contains(home_company));

        for archived in [false, true] {
            if row.is(CATEGORY_PURSUITS, archived) {
                *pick(&mut counts.future_pursuits, &mut counts.archived_pursuits, archived) += 1;
            }

            if row.is(CATEGORY_FEE_PROPOSAL, archived) {
                *pick(
                    &mut counts.active_fee_proposals,
                    &mut counts.archived_fee_proposals,
                    archived,
                ) += 1;
            }

            if !row.is(CATEGORY_PROPOSAL_SUBMITTED, archived) {
                continue;
            }
            *pick(&mut counts.active_proposals, &mut counts.archived_proposals, archived) += 1;

            if row.stage_is(STAGE_MULTI_USE) {
                if is_prime {
                    *pick(
                        &mut counts.active_prime_multiuse,
                        &mut counts.archived_prime_multiuse,
                        archived,
                    ) += 1;
                }
                if is_sub {
                    *pick(
                        &mut counts.active_sub_multiuse,
                        &mut counts.archived_sub_multiuse,
                        archived,
                    ) += 1;
                }
            }
            if row.stage_is(STAGE_AE_SELECTED) {
                *pick(
                    &mut counts.active_ae_selected,
                    &mut counts.archived_ae_selected,
                    archived,
                ) += 1;
            }
            if row.stage_is(STAGE_SINGLE_USE) {
                *pick(
                    &mut counts.active_single_use,
                    &mut counts.archived_single_use,
                    archived,
                ) += 1;
            }

            let awarded = row.status.as_deref() == Some(STATUS_AWARDED);
            let contract_stage = row
                .stage
                .as_deref()
                .is_some_and(|stage| CONTRACT_STAGES.contains(&stage));
            if !archived && awarded && contract_stage {
                counts.project_avenue += 1;
            }
        }
    }

    counts
}

fn pick<'a>(active: &'a mut usize, archived: &'a mut usize, is_archived: bool) -> &'a mut usize {
    if is_archived {
        archived
    } else {
        active
    }
}
