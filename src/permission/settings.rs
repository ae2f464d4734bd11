/* This file is part of DarkFi (https://dark.fi)
 *
 * Copyright (C) 2020-2026 Dyne.org foundation
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use std::{fmt, str::FromStr, time::Duration};

use structopt::StructOpt;

use super::{PermissionId, ROOT_PERMISSION_ID};
use crate::{Error, Result};

/// What a grant of an already granted record, or a revoke of an
/// already unset one, does.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Succeed without changing state or emitting a notification
    #[default]
    Idempotent,
    /// Fail with `PermissionAlreadyGranted` / `PermissionAlreadyRevoked`
    Strict,
}

impl FromStr for DuplicatePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "idempotent" => Ok(Self::Idempotent),
            "strict" => Ok(Self::Strict),
            _ => Err(Error::ParseFailed("Duplicate policy must be `idempotent` or `strict`")),
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Idempotent => write!(f, "idempotent"),
            Self::Strict => write!(f, "strict"),
        }
    }
}

/// Permission manager settings, fixed at construction.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Behaviour on duplicate grants and revokes
    pub duplicate_policy: DuplicatePolicy,
    /// Oracle decision timeout (in milliseconds)
    pub oracle_timeout: u64,
    /// Permissions (names or hex ids) that can never be granted on a
    /// wildcard side, in addition to ROOT
    pub restricted_permissions: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::Idempotent,
            oracle_timeout: 5000,
            restricted_permissions: vec![],
        }
    }
}

impl Settings {
    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle_timeout)
    }

    /// Identifiers of all restricted permissions, given either by name
    /// or as `0x`-prefixed hex. ROOT is always included.
    pub fn restricted_ids(&self) -> Result<Vec<PermissionId>> {
        let mut ids = vec![*ROOT_PERMISSION_ID];
        for permission in &self.restricted_permissions {
            let id = PermissionId::parse(permission)?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}

/// Defines the permission manager settings.
#[derive(Clone, Debug, Default, serde::Deserialize, StructOpt)]
#[structopt()]
pub struct SettingsOpt {
    /// Behaviour on duplicate grants and revokes (idempotent, strict)
    #[structopt(long)]
    pub duplicate_policy: Option<DuplicatePolicy>,

    /// Oracle decision timeout in milliseconds
    #[structopt(long)]
    pub oracle_timeout: Option<u64>,

    /// Permission names or hex ids never grantable on a wildcard side
    #[serde(default)]
    #[structopt(long = "restrict", number_of_values = 1)]
    pub restricted_permissions: Vec<String>,
}

impl SettingsOpt {
    /// Fill options unset here from `other`.
    pub fn or(self, other: SettingsOpt) -> Self {
        let restricted_permissions = if self.restricted_permissions.is_empty() {
            other.restricted_permissions
        } else {
            self.restricted_permissions
        };

        Self {
            duplicate_policy: self.duplicate_policy.or(other.duplicate_policy),
            oracle_timeout: self.oracle_timeout.or(other.oracle_timeout),
            restricted_permissions,
        }
    }
}

impl From<SettingsOpt> for Settings {
    fn from(opt: SettingsOpt) -> Self {
        let def = Settings::default();

        Self {
            duplicate_policy: opt.duplicate_policy.unwrap_or(def.duplicate_policy),
            oracle_timeout: opt.oracle_timeout.unwrap_or(def.oracle_timeout),
            restricted_permissions: opt.restricted_permissions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_from_toml() -> Result<()> {
        let opt: SettingsOpt = toml::from_str(
            r#"
            duplicate_policy = "strict"
            restricted_permissions = ["ADMIN_PERMISSION", "ROOT_PERMISSION"]
            "#,
        )?;

        let settings = Settings::from(opt);
        assert_eq!(settings.duplicate_policy, DuplicatePolicy::Strict);
        assert_eq!(settings.oracle_timeout(), Duration::from_millis(5000));

        let restricted = settings.restricted_ids()?;
        assert_eq!(restricted.len(), 2);
        assert_eq!(restricted[0], *ROOT_PERMISSION_ID);
        assert_eq!(restricted[1], PermissionId::from_name("ADMIN_PERMISSION"));

        let settings = Settings::from(SettingsOpt::default());
        assert_eq!(settings.duplicate_policy, DuplicatePolicy::Idempotent);
        assert_eq!(settings.restricted_ids()?, vec![*ROOT_PERMISSION_ID]);

        Ok(())
    }

    #[test]
    fn restricted_hex_ids() -> Result<()> {
        let mint = PermissionId::from_name("MINT_PERMISSION");
        let settings = Settings {
            restricted_permissions: vec![mint.to_string(), ROOT_PERMISSION_ID.to_string()],
            ..Default::default()
        };
        assert_eq!(settings.restricted_ids()?, vec![*ROOT_PERMISSION_ID, mint]);

        // Right length and prefix, but not hex
        let bad = format!("0x{}", "zz".repeat(32));
        let settings = Settings { restricted_permissions: vec![bad], ..Default::default() };
        assert!(matches!(settings.restricted_ids(), Err(Error::HexDecodeError(_))));

        Ok(())
    }

    #[test]
    fn settings_merge() {
        let cli = SettingsOpt { oracle_timeout: Some(10), ..Default::default() };
        let file = SettingsOpt {
            duplicate_policy: Some(DuplicatePolicy::Strict),
            oracle_timeout: Some(20),
            restricted_permissions: vec!["ADMIN_PERMISSION".to_string()],
        };

        let merged = cli.or(file);
        assert_eq!(merged.oracle_timeout, Some(10));
        assert_eq!(merged.duplicate_policy, Some(DuplicatePolicy::Strict));
        assert_eq!(merged.restricted_permissions.len(), 1);

        assert!("STRICT".parse::<DuplicatePolicy>().is_ok());
        assert!("lenient".parse::<DuplicatePolicy>().is_err());
    }
}
