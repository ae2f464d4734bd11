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

use log::{debug, info, warn};
use sled_overlay::sled;
use smol::lock::RwLock;

use super::{
    Address, AuthorizationEvaluator, DuplicatePolicy, MultiTargetPermission, OracleRegistry,
    PermissionEvent, PermissionId, PermissionOperation, PermissionOraclePtr, PermissionReader,
    PermissionStore, PermissionStoreOverlay, PermissionValue, Settings, SingleTargetPermission,
    ALLOW_FLAG, ANY_ADDR, ROOT_PERMISSION_ID, UNSET_FLAG,
};
use crate::{
    system::{Publisher, PublisherPtr, Subscription},
    Error, Result,
};

/// Writes and events staged by a single mutation or batch. Nothing is
/// visible outside until [`PermissionManager::commit`] applies it.
struct PendingMutation {
    overlay: PermissionStoreOverlay,
    events: Vec<PermissionEvent>,
}

impl PendingMutation {
    fn new(store: &PermissionStore) -> Result<Self> {
        Ok(Self { overlay: PermissionStoreOverlay::new(store)?, events: vec![] })
    }
}

/// Permission manager deployed at address `here`.
///
/// Checks run concurrently with each other. Mutations are serialized and
/// each one, batches included, is applied atomically or not at all.
pub struct PermissionManager {
    here: Address,
    store: PermissionStore,
    oracles: OracleRegistry,
    settings: Settings,
    restricted: Vec<PermissionId>,
    lock: RwLock<()>,
    publisher: PublisherPtr<PermissionEvent>,
}

impl PermissionManager {
    /// Open a manager at `here` over the permission trees of `db`.
    pub fn new(db: &sled::Db, here: Address, settings: Settings) -> Result<Self> {
        if here == UNSET_FLAG || here == ALLOW_FLAG || here.is_any() {
            return Err(Error::InvalidManagerAddress(here))
        }

        let store = PermissionStore::new(db)?;
        let restricted = settings.restricted_ids()?;

        debug!(
            target: "permission::manager::new",
            "Opened permission manager {} ({} records, policy {})",
            here, store.len(), settings.duplicate_policy,
        );

        Ok(Self {
            here,
            store,
            oracles: OracleRegistry::new(),
            settings,
            restricted,
            lock: RwLock::new(()),
            publisher: Publisher::new(),
        })
    }

    /// Address of the manager itself. ROOT on it authorizes mutations on
    /// every target.
    pub fn address(&self) -> Address {
        self.here
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &PermissionStore {
        &self.store
    }

    /// Grant ROOT on the manager to `owner`. Succeeds once per manager
    /// address and database.
    pub async fn init(&self, owner: &Address) -> Result<()> {
        let _guard = self.lock.write().await;

        let mut pending = PendingMutation::new(&self.store)?;
        if pending.overlay.is_initialized(&self.here)? {
            warn!(target: "permission::manager::init", "Manager {} is already initialized", self.here);
            return Err(Error::AlreadyInitialized)
        }

        if owner.is_any() {
            return Err(Error::WildcardRestricted {
                target: self.here,
                actor: *owner,
                permission_id: *ROOT_PERMISSION_ID,
            })
        }

        pending.overlay.set(&self.here, owner, &ROOT_PERMISSION_ID, PermissionValue::Allow)?;
        pending.overlay.set_initialized(&self.here)?;
        pending.events.push(PermissionEvent::Granted {
            permission_id: *ROOT_PERMISSION_ID,
            caller: self.here,
            target: self.here,
            actor: *owner,
            value: PermissionValue::Allow,
        });

        self.commit(pending)?;
        info!(target: "permission::manager::init", "Manager {} initialized, owner {}", self.here, owner);
        Ok(())
    }

    /// Grant `permission_id` on `target` to `actor` unconditionally.
    pub async fn grant(
        &self,
        caller: &Address,
        target: &Address,
        actor: &Address,
        permission_id: &PermissionId,
    ) -> Result<()> {
        let _guard = self.lock.write().await;

        let result = async {
            let mut pending = PendingMutation::new(&self.store)?;
            self.authorize(&pending, caller, target).await?;
            self.stage_grant(&mut pending, caller, target, actor, permission_id, None)?;
            self.commit(pending)
        }
        .await;

        log_rejection("permission::manager::grant", &result);
        result
    }

    /// Grant `permission_id` on `target` to `actor`, subject to the
    /// decision of `oracle` at check time. `ALLOW_FLAG` as the oracle
    /// makes this a plain grant.
    pub async fn grant_with_oracle(
        &self,
        caller: &Address,
        target: &Address,
        actor: &Address,
        permission_id: &PermissionId,
        oracle: &Address,
    ) -> Result<()> {
        let _guard = self.lock.write().await;

        let result = async {
            let mut pending = PendingMutation::new(&self.store)?;
            self.authorize(&pending, caller, target).await?;
            self.stage_grant(&mut pending, caller, target, actor, permission_id, Some(oracle))?;
            self.commit(pending)
        }
        .await;

        log_rejection("permission::manager::grant_with_oracle", &result);
        result
    }

    /// Reset the record of `actor` for `permission_id` on `target`.
    pub async fn revoke(
        &self,
        caller: &Address,
        target: &Address,
        actor: &Address,
        permission_id: &PermissionId,
    ) -> Result<()> {
        let _guard = self.lock.write().await;

        let result = async {
            let mut pending = PendingMutation::new(&self.store)?;
            self.authorize(&pending, caller, target).await?;
            self.stage_revoke(&mut pending, caller, target, actor, permission_id)?;
            self.commit(pending)
        }
        .await;

        log_rejection("permission::manager::revoke", &result);
        result
    }

    /// Make `permission_id` on `target` immutable, forever.
    pub async fn freeze(
        &self,
        caller: &Address,
        target: &Address,
        permission_id: &PermissionId,
    ) -> Result<()> {
        let _guard = self.lock.write().await;

        let result = async {
            let mut pending = PendingMutation::new(&self.store)?;
            self.authorize(&pending, caller, target).await?;
            self.stage_freeze(&mut pending, target, permission_id)?;
            self.commit(pending)
        }
        .await;

        log_rejection("permission::manager::freeze", &result);
        result
    }

    /// Apply `permissions` in order on a single `target`. The caller is
    /// authorized once, before the first item. Any failing item rejects
    /// the whole batch.
    pub async fn bulk_on_single_target(
        &self,
        caller: &Address,
        target: &Address,
        permissions: &[SingleTargetPermission],
    ) -> Result<()> {
        let _guard = self.lock.write().await;

        let result = async {
            let mut pending = PendingMutation::new(&self.store)?;
            self.authorize(&pending, caller, target).await?;

            for item in permissions {
                self.stage_operation(
                    &mut pending,
                    caller,
                    target,
                    &item.actor,
                    &item.permission_id,
                    &item.operation,
                )?;
            }

            self.commit(pending)
        }
        .await;

        match &result {
            Ok(()) => info!(
                target: "permission::manager::bulk_on_single_target",
                "Applied {} operations on {}", permissions.len(), target,
            ),
            Err(_) => log_rejection("permission::manager::bulk_on_single_target", &result),
        }
        result
    }

    /// Apply `permissions` in order, each on its own target. The caller
    /// is authorized for every item against the state staged by the
    /// items before it. Any failing item rejects the whole batch.
    pub async fn bulk_on_multi_target(
        &self,
        caller: &Address,
        permissions: &[MultiTargetPermission],
    ) -> Result<()> {
        let _guard = self.lock.write().await;

        let result = async {
            let mut pending = PendingMutation::new(&self.store)?;

            for item in permissions {
                self.authorize(&pending, caller, &item.target).await?;
                self.stage_operation(
                    &mut pending,
                    caller,
                    &item.target,
                    &item.actor,
                    &item.permission_id,
                    &item.operation,
                )?;
            }

            self.commit(pending)
        }
        .await;

        match &result {
            Ok(()) => info!(
                target: "permission::manager::bulk_on_multi_target",
                "Applied {} operations", permissions.len(),
            ),
            Err(_) => log_rejection("permission::manager::bulk_on_multi_target", &result),
        }
        result
    }

    /// Whether `actor` holds `permission_id` on `target`. Oracle faults
    /// are logged and answered with `false`.
    pub async fn is_granted(
        &self,
        target: &Address,
        actor: &Address,
        permission_id: &PermissionId,
        data: &[u8],
    ) -> bool {
        match self.check_permission(target, actor, permission_id, data).await {
            Ok(granted) => granted,
            Err(e) => {
                warn!(
                    target: "permission::manager::is_granted",
                    "Check of {} for {} on {} failed: {}", permission_id, actor, target, e,
                );
                false
            }
        }
    }

    /// Same as [`PermissionManager::is_granted`], surfacing oracle and
    /// database faults.
    pub async fn check_permission(
        &self,
        target: &Address,
        actor: &Address,
        permission_id: &PermissionId,
        data: &[u8],
    ) -> Result<bool> {
        let _guard = self.lock.read().await;
        AuthorizationEvaluator::new(&self.store, &self.oracles, self.settings.oracle_timeout())
            .check(target, actor, permission_id, data)
            .await
    }

    pub async fn is_frozen(&self, target: &Address, permission_id: &PermissionId) -> Result<bool> {
        let _guard = self.lock.read().await;
        self.store.get_frozen(target, permission_id)
    }

    /// Raw record of `actor` for `permission_id` on `target`, without
    /// wildcard fallback or oracle evaluation.
    pub async fn get_auth_permission(
        &self,
        target: &Address,
        actor: &Address,
        permission_id: &PermissionId,
    ) -> Result<PermissionValue> {
        let _guard = self.lock.read().await;
        self.store.get(target, actor, permission_id)
    }

    pub async fn register_oracle(&self, address: Address, oracle: PermissionOraclePtr) -> Result<()> {
        self.oracles.register(address, oracle).await
    }

    pub async fn unregister_oracle(&self, address: &Address) -> Option<PermissionOraclePtr> {
        self.oracles.unregister(address).await
    }

    /// Subscribe to change notifications. Only committed changes are
    /// published, in the order they were made.
    pub fn subscribe(&self) -> Subscription<PermissionEvent> {
        self.publisher.clone().subscribe()
    }

    /// Replay journaled changes starting at sequence number `from`.
    pub fn events_since(&self, from: u64) -> Result<Vec<(u64, PermissionEvent)>> {
        self.store.events_since(from)
    }

    /// Fail with `Unauthorized` unless `caller` holds ROOT on `target` or
    /// on the manager, as seen by the pending mutation. An oracle fault on
    /// the target does not stop the manager-wide check, and is returned
    /// only when neither check grants.
    async fn authorize(
        &self,
        pending: &PendingMutation,
        caller: &Address,
        target: &Address,
    ) -> Result<()> {
        let evaluator = AuthorizationEvaluator::new(
            &pending.overlay,
            &self.oracles,
            self.settings.oracle_timeout(),
        );

        let fault = match evaluator.check(target, caller, &ROOT_PERMISSION_ID, &[]).await {
            Ok(true) => return Ok(()),
            Ok(false) => None,
            Err(e) => {
                warn!(
                    target: "permission::manager::authorize",
                    "ROOT check of {} on {} failed: {}", caller, target, e,
                );
                Some(e)
            }
        };

        if *target != self.here &&
            evaluator.check(&self.here, caller, &ROOT_PERMISSION_ID, &[]).await?
        {
            return Ok(())
        }

        if let Some(e) = fault {
            return Err(e)
        }

        Err(Error::Unauthorized {
            here: self.here,
            target: *target,
            actor: *caller,
            permission_id: *ROOT_PERMISSION_ID,
        })
    }

    fn stage_operation(
        &self,
        pending: &mut PendingMutation,
        caller: &Address,
        target: &Address,
        actor: &Address,
        permission_id: &PermissionId,
        operation: &PermissionOperation,
    ) -> Result<()> {
        match operation {
            PermissionOperation::Grant => {
                self.stage_grant(pending, caller, target, actor, permission_id, None)
            }
            PermissionOperation::GrantWithOracle(oracle) => {
                self.stage_grant(pending, caller, target, actor, permission_id, Some(oracle))
            }
            PermissionOperation::Revoke => {
                self.stage_revoke(pending, caller, target, actor, permission_id)
            }
            PermissionOperation::Freeze => self.stage_freeze(pending, target, permission_id),
        }
    }

    fn stage_grant(
        &self,
        pending: &mut PendingMutation,
        caller: &Address,
        target: &Address,
        actor: &Address,
        permission_id: &PermissionId,
        oracle: Option<&Address>,
    ) -> Result<()> {
        let oracle = match oracle {
            Some(o) if *o == UNSET_FLAG || *o == ANY_ADDR => return Err(Error::InvalidOracle(*o)),
            Some(o) if *o == ALLOW_FLAG => None,
            o => o,
        };

        if target.is_any() && actor.is_any() {
            return Err(Error::WildcardBothSides)
        }

        if target.is_any() || actor.is_any() {
            if self.restricted.contains(permission_id) {
                return Err(Error::WildcardRestricted {
                    target: *target,
                    actor: *actor,
                    permission_id: *permission_id,
                })
            }

            if oracle.is_none() {
                return Err(Error::OracleRequiredForWildcard {
                    target: *target,
                    actor: *actor,
                    permission_id: *permission_id,
                })
            }
        }

        if pending.overlay.get_frozen(target, permission_id)? {
            return Err(Error::AlreadyFrozen { target: *target, permission_id: *permission_id })
        }

        let value = match oracle {
            Some(o) => PermissionValue::Oracle(*o),
            None => PermissionValue::Allow,
        };

        let current = pending.overlay.get(target, actor, permission_id)?;
        if current == value {
            return match self.settings.duplicate_policy {
                DuplicatePolicy::Idempotent => Ok(()),
                DuplicatePolicy::Strict => Err(Error::PermissionAlreadyGranted {
                    target: *target,
                    actor: *actor,
                    permission_id: *permission_id,
                }),
            }
        }

        if !current.is_unset() {
            return Err(Error::AlreadyGrantedDifferentOracle {
                target: *target,
                actor: *actor,
                permission_id: *permission_id,
                current,
                requested: value,
            })
        }

        pending.overlay.set(target, actor, permission_id, value)?;
        pending.events.push(PermissionEvent::Granted {
            permission_id: *permission_id,
            caller: *caller,
            target: *target,
            actor: *actor,
            value,
        });

        Ok(())
    }

    fn stage_revoke(
        &self,
        pending: &mut PendingMutation,
        caller: &Address,
        target: &Address,
        actor: &Address,
        permission_id: &PermissionId,
    ) -> Result<()> {
        if pending.overlay.get_frozen(target, permission_id)? {
            return Err(Error::AlreadyFrozen { target: *target, permission_id: *permission_id })
        }

        if pending.overlay.get(target, actor, permission_id)?.is_unset() {
            return match self.settings.duplicate_policy {
                DuplicatePolicy::Idempotent => Ok(()),
                DuplicatePolicy::Strict => Err(Error::PermissionAlreadyRevoked {
                    target: *target,
                    actor: *actor,
                    permission_id: *permission_id,
                }),
            }
        }

        pending.overlay.set(target, actor, permission_id, PermissionValue::Unset)?;
        pending.events.push(PermissionEvent::Revoked {
            permission_id: *permission_id,
            caller: *caller,
            target: *target,
            actor: *actor,
        });

        Ok(())
    }

    fn stage_freeze(
        &self,
        pending: &mut PendingMutation,
        target: &Address,
        permission_id: &PermissionId,
    ) -> Result<()> {
        if target.is_any() {
            return Err(Error::WildcardTargetDisallowed)
        }

        if pending.overlay.get_frozen(target, permission_id)? {
            return Err(Error::AlreadyFrozen { target: *target, permission_id: *permission_id })
        }

        pending.overlay.set_frozen(target, permission_id)?;
        pending.events.push(PermissionEvent::Frozen { target: *target, permission_id: *permission_id });

        Ok(())
    }

    /// Journal the staged events, apply the overlay, then notify
    /// subscribers.
    fn commit(&self, mut pending: PendingMutation) -> Result<()> {
        for event in &pending.events {
            let seq = pending.overlay.append_event(event)?;
            debug!(target: "permission::manager::commit", "[{}] {}", seq, event);
        }

        pending.overlay.apply()?;

        for event in pending.events {
            self.publisher.notify(event);
        }

        Ok(())
    }
}

fn log_rejection(target: &str, result: &Result<()>) {
    if let Err(e) = result {
        warn!(target: target, "Mutation rejected: {}", e);
    }
}
