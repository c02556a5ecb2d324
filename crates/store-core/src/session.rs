//! # Session Context
//!
//! Who is logged in and what they already own. The VIP flag held here is
//! what drives price resolution everywhere else.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub email: String,
    pub name: String,
    pub is_vip: bool,
}

impl SessionUser {
    pub fn new(email: impl Into<String>, name: impl Into<String>, is_vip: bool) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            is_vip,
        }
    }

    /// First word of the display name, for greetings
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

/// Per-session state: the user plus the set of product codes they own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    user: Option<SessionUser>,
    purchased: BTreeSet<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(user: SessionUser) -> Self {
        Self {
            user: Some(user),
            ..Self::default()
        }
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    pub fn set_user(&mut self, user: SessionUser) {
        self.user = Some(user);
    }

    pub fn is_vip(&self) -> bool {
        self.user.as_ref().map_or(false, |u| u.is_vip)
    }

    /// VIP status can flip mid-session (the user buys the subscription)
    pub fn set_vip(&mut self, is_vip: bool) {
        if let Some(user) = self.user.as_mut() {
            user.is_vip = is_vip;
        }
    }

    /// Mark a product as purchased. Idempotent; marking twice is a no-op.
    pub fn mark_purchased(&mut self, code: impl Into<String>) -> bool {
        self.purchased.insert(code.into())
    }

    pub fn mark_all_purchased(&mut self, codes: &[String]) {
        for code in codes {
            self.purchased.insert(code.clone());
        }
    }

    pub fn has_purchased(&self, code: &str) -> bool {
        self.purchased.contains(code)
    }

    pub fn purchased(&self) -> impl Iterator<Item = &str> {
        self.purchased.iter().map(String::as_str)
    }

    pub fn purchased_codes(&self) -> Vec<String> {
        self.purchased.iter().cloned().collect()
    }

    /// Replace the owned set wholesale (initial store data load)
    pub fn set_purchased(&mut self, codes: Vec<String>) {
        self.purchased = codes.into_iter().collect();
    }
}
