//! Staff tiers and the permission set each one grants.
//!
//! The valid tier names and their permission lists are one unit: the
//! table is configuration, and validation and lookup both read from
//! it.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::AuthError;

/// Capability granted to tiers that may onboard new staff.
pub const GENERATE_INVITATION_CODES: &str = "generate_invitation_codes";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct TierTable {
    tiers: BTreeMap<String, Vec<String>>,
}

impl TierTable {
    pub fn new<I, P>(tiers: I) -> Self
    where
        I: IntoIterator<Item = (String, P)>,
        P: IntoIterator<Item = String>,
    {
        Self {
            tiers: tiers
                .into_iter()
                .map(|(tier, perms)| (tier, perms.into_iter().collect()))
                .collect(),
        }
    }

    /// Accepts `tier` only if it names a configured tier.
    pub fn validate_tier<'a>(&self, tier: &'a str) -> Result<&'a str, AuthError> {
        if self.tiers.contains_key(tier) {
            Ok(tier)
        } else {
            Err(AuthError::InvalidTier {
                valid: self.tier_names().join(", "),
            })
        }
    }

    /// Permissions granted to `tier`; empty for unknown tiers.
    pub fn permissions_for(&self, tier: &str) -> Vec<String> {
        self.tiers.get(tier).cloned().unwrap_or_default()
    }

    pub fn tier_names(&self) -> Vec<&str> {
        self.tiers.keys().map(String::as_str).collect()
    }
}

impl Default for TierTable {
    fn default() -> Self {
        let trabajador = vec![
            "view_products",
            "view_orders",
            "update_order_status",
            "view_customers",
            "manage_own_profile",
        ];
        let admin = vec![
            "view_products",
            "view_orders",
            "update_order_status",
            "view_customers",
            "manage_products",
            "manage_orders",
            "manage_staff_basic",
            "view_reports",
            "manage_inventory",
            GENERATE_INVITATION_CODES,
            "manage_all_profiles",
        ];

        Self::new([("admin", admin), ("trabajador", trabajador)].map(|(tier, perms)| {
            (
                tier.to_string(),
                perms.into_iter().map(String::from).collect::<Vec<_>>(),
            )
        }))
    }
}
