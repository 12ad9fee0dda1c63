use serde::{Deserialize, Serialize};

use super::ActorStatus;

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    pub group_id: String,
    pub name: String,
    pub actor_count: usize,
    pub actors: Vec<ActorStatus>,
}
