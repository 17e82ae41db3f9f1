//! git_server: source control hosts codebases are imported from.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::git_server;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = git_server)]
pub struct GitServer {
    pub id: i64,
    pub name: String,
    pub hostname: String,
    pub available: bool,
}

#[derive(Debug, Clone, Insertable, Deserialize)]
#[diesel(table_name = git_server)]
pub struct NewGitServer {
    pub name: String,
    pub hostname: String,
    pub available: bool,
}
