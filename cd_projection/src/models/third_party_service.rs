//! third_party_service: external services a pipeline depends on.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::third_party_service;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = third_party_service)]
pub struct ThirdPartyService {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone, Insertable, Deserialize)]
#[diesel(table_name = third_party_service)]
pub struct NewThirdPartyService {
    pub name: String,
    pub description: String,
    pub version: String,
}
