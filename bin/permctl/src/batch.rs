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

//! Batch files for the `bulk` subcommand.
//!
//! ```toml
//! ## Optional. When set, every operation applies on this target and
//! ## operations must not carry their own.
//! target = "0x..."
//!
//! [[operation]]
//! kind = "grant"          # grant, grant-with-oracle, revoke, freeze
//! target = "0x..."
//! actor = "0x..."         # not needed for freeze
//! permission = "ADMIN_PERMISSION"
//! oracle = "0x..."        # grant-with-oracle only
//! ```

use std::str::FromStr;

use serde::Deserialize;

use darkfi_permission::{
    permission::{
        Address, MultiTargetPermission, PermissionId, PermissionOperation, SingleTargetPermission,
        UNSET_FLAG,
    },
    Error, Result,
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BatchFile {
    target: Option<String>,
    #[serde(default, rename = "operation")]
    operations: Vec<OperationEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OperationEntry {
    kind: String,
    target: Option<String>,
    actor: Option<String>,
    permission: String,
    oracle: Option<String>,
}

/// Parsed batch, ready to submit.
#[derive(Debug, PartialEq)]
pub enum Batch {
    Single { target: Address, permissions: Vec<SingleTargetPermission> },
    Multi(Vec<MultiTargetPermission>),
}

impl Batch {
    pub fn len(&self) -> usize {
        match self {
            Self::Single { permissions, .. } => permissions.len(),
            Self::Multi(permissions) => permissions.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OperationEntry {
    fn operation(&self) -> Result<PermissionOperation> {
        let operation = match self.kind.as_str() {
            "grant" => PermissionOperation::Grant,
            "revoke" => PermissionOperation::Revoke,
            "freeze" => PermissionOperation::Freeze,
            "grant-with-oracle" => {
                let Some(oracle) = &self.oracle else {
                    return Err(Error::ParseFailed("grant-with-oracle needs an oracle"))
                };
                PermissionOperation::GrantWithOracle(Address::from_str(oracle)?)
            }
            _ => return Err(Error::ParseFailed("Unknown operation kind")),
        };

        if self.oracle.is_some() && !matches!(operation, PermissionOperation::GrantWithOracle(_)) {
            return Err(Error::ParseFailed("Only grant-with-oracle takes an oracle"))
        }

        Ok(operation)
    }

    fn actor(&self, operation: &PermissionOperation) -> Result<Address> {
        match (&self.actor, operation) {
            (Some(actor), _) => Address::from_str(actor),
            // Freezing ignores the actor
            (None, PermissionOperation::Freeze) => Ok(UNSET_FLAG),
            (None, _) => Err(Error::ParseFailed("Operation needs an actor")),
        }
    }
}

/// Parse a batch file.
pub fn parse_batch(contents: &str) -> Result<Batch> {
    let file: BatchFile = toml::from_str(contents)?;

    let Some(target) = file.target else {
        let mut permissions = Vec::with_capacity(file.operations.len());
        for entry in &file.operations {
            let Some(target) = &entry.target else {
                return Err(Error::ParseFailed("Operation needs a target"))
            };
            let operation = entry.operation()?;
            permissions.push(MultiTargetPermission {
                operation,
                target: Address::from_str(target)?,
                actor: entry.actor(&operation)?,
                permission_id: PermissionId::parse(&entry.permission)?,
            });
        }
        return Ok(Batch::Multi(permissions))
    };

    let mut permissions = Vec::with_capacity(file.operations.len());
    for entry in &file.operations {
        if entry.target.is_some() {
            return Err(Error::ParseFailed("Operations of a single-target batch have no target"))
        }
        let operation = entry.operation()?;
        permissions.push(SingleTargetPermission {
            operation,
            actor: entry.actor(&operation)?,
            permission_id: PermissionId::parse(&entry.permission)?,
        });
    }

    Ok(Batch::Single { target: Address::from_str(&target)?, permissions })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: &str = "0x0000000000000000000000000000000000000001";
    const ALICE: &str = "0x00000000000000000000000000000000000000a1";
    const ORACLE: &str = "0x00000000000000000000000000000000000000e1";

    #[test]
    fn single_target_batch() -> Result<()> {
        let contents = format!(
            r#"
            target = "{TARGET}"

            [[operation]]
            kind = "revoke"
            actor = "{ALICE}"
            permission = "ADMIN_PERMISSION"

            [[operation]]
            kind = "grant-with-oracle"
            actor = "{ALICE}"
            permission = "ADMIN_PERMISSION"
            oracle = "{ORACLE}"

            [[operation]]
            kind = "freeze"
            permission = "ADMIN_PERMISSION"
            "#
        );

        let Batch::Single { target, permissions } = parse_batch(&contents)? else {
            panic!("Expected a single-target batch")
        };

        let admin = PermissionId::from_name("ADMIN_PERMISSION");
        assert_eq!(target, Address::from_str(TARGET)?);
        assert_eq!(permissions.len(), 3);
        assert_eq!(permissions[0].operation, PermissionOperation::Revoke);
        assert_eq!(permissions[0].permission_id, admin);
        assert_eq!(
            permissions[1].operation,
            PermissionOperation::GrantWithOracle(Address::from_str(ORACLE)?)
        );
        assert_eq!(permissions[2].operation, PermissionOperation::Freeze);
        Ok(())
    }

    #[test]
    fn multi_target_batch() -> Result<()> {
        let contents = format!(
            r#"
            [[operation]]
            kind = "grant"
            target = "{TARGET}"
            actor = "{ALICE}"
            permission = "ADMIN_PERMISSION"
            "#
        );

        let batch = parse_batch(&contents)?;
        assert_eq!(batch.len(), 1);
        assert!(matches!(batch, Batch::Multi(_)));
        Ok(())
    }

    #[test]
    fn malformed_batches() {
        let missing_target = format!(
            "[[operation]]\nkind = \"grant\"\nactor = \"{ALICE}\"\npermission = \"P\"\n"
        );
        assert!(parse_batch(&missing_target).is_err());

        let stray_oracle = format!(
            "target = \"{TARGET}\"\n[[operation]]\nkind = \"grant\"\nactor = \"{ALICE}\"\npermission = \"P\"\noracle = \"{ORACLE}\"\n"
        );
        assert!(parse_batch(&stray_oracle).is_err());

        let unknown_kind = format!(
            "target = \"{TARGET}\"\n[[operation]]\nkind = \"burn\"\nactor = \"{ALICE}\"\npermission = \"P\"\n"
        );
        assert!(parse_batch(&unknown_kind).is_err());
    }
}
