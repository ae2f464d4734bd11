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

use std::time::Duration;

use log::{debug, warn};

use super::{Address, OracleRegistry, PermissionId, PermissionReader, PermissionValue, ANY_ADDR};
use crate::{Error, Result};

/// Answers whether an actor may exercise a permission on a target, over
/// any [`PermissionReader`].
///
/// Lookups are tried in order and the first one granting wins:
/// 1. the record of `actor` on `target`
/// 2. the record of `ANY_ADDR` on `target`
/// 3. the record of `actor` on `ANY_ADDR`
///
/// A record referencing an oracle is answered by that oracle, which
/// always receives the requested target and actor. A faulty oracle
/// does not grant, and evaluation goes on with the next lookup.
pub struct AuthorizationEvaluator<'a, R: PermissionReader> {
    reader: &'a R,
    oracles: &'a OracleRegistry,
    oracle_timeout: Duration,
}

impl<'a, R: PermissionReader> AuthorizationEvaluator<'a, R> {
    pub fn new(reader: &'a R, oracles: &'a OracleRegistry, oracle_timeout: Duration) -> Self {
        Self { reader, oracles, oracle_timeout }
    }

    /// Evaluate the request. The first oracle fault is returned only
    /// when no lookup grants.
    pub async fn check(
        &self,
        target: &Address,
        actor: &Address,
        permission_id: &PermissionId,
        data: &[u8],
    ) -> Result<bool> {
        let lookups = [(target, actor), (target, &ANY_ADDR), (&ANY_ADDR, actor)];
        let mut fault: Option<Error> = None;

        for (record_target, record_actor) in lookups {
            let value = self.reader.get(record_target, record_actor, permission_id)?;
            let granted = match value {
                PermissionValue::Unset => false,
                PermissionValue::Allow => true,
                PermissionValue::Oracle(oracle) => match self
                    .oracles
                    .query(&oracle, self.oracle_timeout, target, actor, permission_id, data)
                    .await
                {
                    Ok(decision) => decision,
                    Err(e) => {
                        warn!(
                            target: "permission::evaluator::check",
                            "Record ({}, {}) for {} skipped: {}",
                            record_target, record_actor, permission_id, e,
                        );
                        fault.get_or_insert(e);
                        false
                    }
                },
            };

            if granted {
                debug!(
                    target: "permission::evaluator::check",
                    "{} holds {} on {} through record ({}, {})",
                    actor, permission_id, target, record_target, record_actor,
                );
                return Ok(true)
            }
        }

        if let Some(e) = fault {
            return Err(e)
        }

        debug!(
            target: "permission::evaluator::check",
            "{} does not hold {} on {}", actor, permission_id, target,
        );
        Ok(false)
    }
}
