//! Per-request context handed to permissions and hooks

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::{middleware::auth::AuthenticatedUser, utils::now_utc};

/// The six generated actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    List,
    Create,
    Retrieve,
    Update,
    PartialUpdate,
    Destroy,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::List,
        Action::Create,
        Action::Retrieve,
        Action::Update,
        Action::PartialUpdate,
        Action::Destroy,
    ];

    /// Read-only actions
    pub fn is_safe(self) -> bool {
        matches!(self, Action::List | Action::Retrieve)
    }

    /// HTTP method the action is routed on
    pub fn method(self) -> &'static str {
        match self {
            Action::List | Action::Retrieve => "GET",
            Action::Create => "POST",
            Action::Update => "PUT",
            Action::PartialUpdate => "PATCH",
            Action::Destroy => "DELETE",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Create => "create",
            Action::Retrieve => "retrieve",
            Action::Update => "update",
            Action::PartialUpdate => "partial_update",
            Action::Destroy => "destroy",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is asking, for what, with which query parameters
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub action: Action,
    pub user: Option<AuthenticatedUser>,
    pub params: HashMap<String, String>,
    /// Fixed once per request so scopes compare against one instant
    pub now: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(action: Action, user: Option<AuthenticatedUser>) -> Self {
        Self {
            action,
            user,
            params: HashMap::new(),
            now: now_utc(),
        }
    }

    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref().map(|u| u.id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Non-empty query parameter
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Query flag such as `?unsolved_problems=1`
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.param(name), Some(v) if !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"))
    }
}
