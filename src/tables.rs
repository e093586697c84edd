use crate::schema::{Column, ColumnType, EmptyRule, EntitySchema};
use serde::Serialize;

pub const CATEGORY_PURSUITS: &str = "Pursuits";
pub const CATEGORY_PROPOSAL_SUBMITTED: &str = "Proposal Submitted";
pub const CATEGORY_FEE_PROPOSAL: &str = "Fee Proposal";

pub const STATUS_AWAITING_VERDICT: &str = "Awaiting Verdict";
pub const STATUS_AWARDED: &str = "Awarded";

pub const STAGE_MULTI_USE: &str = "Multi-Use Contract";
pub const STAGE_AE_SELECTED: &str = "AE Selected List";
pub const STAGE_SINGLE_USE: &str = "Single Use Contract (Project)";
pub const STAGE_FEE_PROPOSAL: &str = "Fee Proposal";

/// Stage values offered even before any proposal uses them.
pub const PREDEFINED_STAGES: &[&str] = &[
    STAGE_MULTI_USE,
    STAGE_FEE_PROPOSAL,
    STAGE_SINGLE_USE,
    STAGE_AE_SELECTED,
];

/// Stages that count as an awarded contract vehicle.
pub const CONTRACT_STAGES: &[&str] = &[STAGE_AE_SELECTED, STAGE_MULTI_USE, STAGE_SINGLE_USE];

pub const ORG_TYPE_PRIVATE_ENTITY: &str = "Private Entity";

pub static PROPOSALS: EntitySchema = EntitySchema {
    label: "Proposal",
    table: "PROPOSALS",
    key: "PID",
    parent: None,
    order_by: &["TITLE"],
    columns: &[
        Column::identity("PID"),
        Column::text("TITLE"),
        Column::new("ORG_ID", ColumnType::Integer),
        Column::text("PRIME").empty(EmptyRule::NullOnUpdate),
        Column::text("SUB").empty(EmptyRule::NullOnUpdate),
        Column::text("STATUS").empty(EmptyRule::NullOnUpdate),
        Column::text("STAGE").empty(EmptyRule::NullOnUpdate),
        Column::text("CATEGORY"),
        Column::new("ARCHIVE", ColumnType::Flag),
        Column::new("SUBMITTED_DATE", ColumnType::Date),
        Column::new("EXPECTED_DUE_DATE", ColumnType::Date),
        Column::new("CONTRACT_EXP_DATE", ColumnType::Date),
        Column::new("PROJECTED_AMOUNT", ColumnType::Numeric),
        Column::new("PROPOSED_SUB_AMOUNT", ColumnType::Numeric),
        Column::new("SELECTION_CHANCE", ColumnType::Numeric).empty(EmptyRule::NullOnUpdate),
        Column::text("DETAILS").empty(EmptyRule::NullOnUpdate),
        Column::text("MSMM_POC").empty(EmptyRule::NullOnUpdate),
        Column::text("EXTERNAL_POC").empty(EmptyRule::NullOnUpdate),
        Column::text("CLIENT_CONTRACT_NO"),
        Column::text("MSMM_CONTRACT_NO"),
        Column::text("MSMM_CAPACITY"),
        Column::text("AWARD_NUMBER"),
        Column::text("POOL"),
        Column::audit("CREATED_BY", ColumnType::Text),
        Column::audit("CREATED_DATE", ColumnType::Timestamp),
        Column::audit("MODIFIED_BY", ColumnType::Text),
        Column::audit("MODIFIED_DATE", ColumnType::Timestamp),
        Column::joined("CLIENT_NAME"),
        Column::joined("ORG_TYPE"),
    ],
};

pub static ORGANIZATIONS: EntitySchema = EntitySchema {
    label: "Organization",
    table: "ORGANIZATION",
    key: "ORG_ID",
    parent: None,
    order_by: &["ORG_ID"],
    columns: &[
        Column::identity("ORG_ID"),
        Column::text("ORG_FULL_NAME"),
        Column::text("ORG_ABBREVIATION").empty(EmptyRule::NullAlways),
        Column::text("ORG_TYPE").empty(EmptyRule::NullAlways),
        Column::new("ORG_INACTIVE_DATE", ColumnType::Date),
    ],
};

pub static EVENTS: EntitySchema = EntitySchema {
    label: "Event",
    table: "EVENTS",
    key: "EVENT_ID",
    parent: None,
    order_by: &["START_DATE DESC"],
    columns: &[
        Column::identity("EVENT_ID"),
        Column::text("TITLE"),
        Column::text("DESCRIPTION"),
        Column::new("START_DATE", ColumnType::Timestamp),
        Column::new("END_DATE", ColumnType::Timestamp),
        Column::text("LOCATION"),
        Column::text("COLOR"),
        Column::new("ALL_DAY", ColumnType::Flag),
        Column::new("NOTES", ColumnType::LargeText).empty(EmptyRule::NullIfBlank),
        Column::audit("CREATED_DATE", ColumnType::Timestamp),
        Column::audit("MODIFIED_DATE", ColumnType::Timestamp),
    ],
};

/// Owned by the license reminder tool; read-only here.
pub static LICENSES: EntitySchema = EntitySchema {
    label: "License",
    table: "LICENSES",
    key: "LIC_ID",
    parent: None,
    order_by: &["EXPIRATION_DATE"],
    columns: &[
        Column::identity("LIC_ID"),
        Column::text("LIC_NAME"),
        Column::text("LIC_STATE"),
        Column::text("LIC_TYPE"),
        Column::text("LIC_NO"),
        Column::new("EXPIRATION_DATE", ColumnType::Date),
        Column::new("LIC_FULL_TEXT", ColumnType::LargeText),
    ],
};

pub static PROJECTS: EntitySchema = EntitySchema {
    label: "Project",
    table: "CALENDAR_PROJECTS",
    key: "PROJECT_ID",
    parent: None,
    order_by: &["CREATED_AT DESC"],
    columns: &[
        Column::identity("PROJECT_ID"),
        Column::text("PROJECT_NAME"),
        Column::text("DESCRIPTION"),
        Column::new("START_DATE", ColumnType::Date),
        Column::new("END_DATE", ColumnType::Date),
        Column::text("STATUS"),
        Column::text("COLOR"),
        Column::audit("CREATED_AT", ColumnType::Timestamp),
    ],
};

pub static MILESTONES: EntitySchema = EntitySchema {
    label: "Milestone",
    table: "CALENDAR_MILESTONES",
    key: "MILESTONE_ID",
    parent: Some("PROJECT_ID"),
    order_by: &["DUE_DATE"],
    columns: &[
        Column::identity("MILESTONE_ID"),
        Column::new("PROJECT_ID", ColumnType::Integer),
        Column::text("TITLE"),
        Column::text("DESCRIPTION"),
        Column::new("DUE_DATE", ColumnType::Date),
        Column::text("STATUS"),
        Column::audit("CREATED_AT", ColumnType::Timestamp),
    ],
};

pub static RESOURCES: EntitySchema = EntitySchema {
    label: "Resource",
    table: "CALENDAR_RESOURCES",
    key: "RESOURCE_ID",
    parent: Some("PROJECT_ID"),
    order_by: &["RESOURCE_NAME"],
    columns: &[
        Column::identity("RESOURCE_ID"),
        Column::new("PROJECT_ID", ColumnType::Integer),
        Column::text("RESOURCE_NAME"),
        Column::text("ROLE"),
        Column::text("EMAIL"),
        Column::new("ALLOCATION", ColumnType::Numeric),
        Column::audit("CREATED_AT", ColumnType::Timestamp),
    ],
};

pub static TASKS: EntitySchema = EntitySchema {
    label: "Task",
    table: "CALENDAR_TASKS",
    key: "TASK_ID",
    parent: Some("PROJECT_ID"),
    order_by: &["SORT_ORDER", "CREATED_AT"],
    columns: &[
        Column::identity("TASK_ID"),
        Column::new("PROJECT_ID", ColumnType::Integer),
        Column::text("TITLE"),
        Column::text("DESCRIPTION"),
        Column::text("STATUS"),
        Column::text("ASSIGNEE"),
        Column::new("DUE_DATE", ColumnType::Date),
        Column::new("SORT_ORDER", ColumnType::Integer),
        Column::audit("CREATED_AT", ColumnType::Timestamp),
    ],
};

/// Fields the proposal editor shows for one CATEGORY value. The store does
/// not enforce these; any proposal column may be written in any category.
#[derive(Debug, Serialize)]
pub struct Fieldset {
    pub category: &'static str,
    pub fields: &'static [&'static str],
}

pub static CATEGORY_FIELDSETS: &[Fieldset] = &[
    Fieldset {
        category: CATEGORY_PURSUITS,
        fields: &[
            "TITLE",
            "ORG_ID",
            "PRIME",
            "SUB",
            "STATUS",
            "STAGE",
            "DETAILS",
            "EXPECTED_DUE_DATE",
            "SELECTION_CHANCE",
            "PROJECTED_AMOUNT",
            "MSMM_POC",
            "EXTERNAL_POC",
            "CATEGORY",
            "ARCHIVE",
        ],
    },
    Fieldset {
        category: CATEGORY_PROPOSAL_SUBMITTED,
        fields: &[
            "TITLE",
            "ORG_ID",
            "PRIME",
            "SUB",
            "STATUS",
            "STAGE",
            "DETAILS",
            "SUBMITTED_DATE",
            "EXPECTED_DUE_DATE",
            "PROJECTED_AMOUNT",
            "SELECTION_CHANCE",
            "MSMM_POC",
            "EXTERNAL_POC",
            "CATEGORY",
            "ARCHIVE",
            "CLIENT_CONTRACT_NO",
            "MSMM_CONTRACT_NO",
            "CONTRACT_EXP_DATE",
            "MSMM_CAPACITY",
            "AWARD_NUMBER",
            "POOL",
        ],
    },
    Fieldset {
        category: CATEGORY_FEE_PROPOSAL,
        fields: &[
            "TITLE",
            "ORG_ID",
            "PRIME",
            "SUB",
            "STATUS",
            "STAGE",
            "DETAILS",
            "EXPECTED_DUE_DATE",
            "SELECTION_CHANCE",
            "PROJECTED_AMOUNT",
            "PROPOSED_SUB_AMOUNT",
            "MSMM_CAPACITY",
            "CATEGORY",
            "ARCHIVE",
        ],
    },
];

/// Editor widgets that differ from what the column type implies.
pub static FIELD_WIDGETS: &[(&str, &str)] = &[
    ("DETAILS", "textarea"),
    ("ORG_ID", "select"),
    ("PRIME", "select-with-add"),
    ("SUB", "select-with-add"),
    ("STATUS", "select-with-add"),
    ("STAGE", "select-with-add"),
    ("ARCHIVE", "select"),
    ("CATEGORY", "select"),
];
