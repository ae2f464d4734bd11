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

use darkfi_serial::{deserialize, serialize};
use log::debug;
use sled_overlay::{
    sled::{self, IVec},
    SledDbOverlay,
};

use super::{
    frozen_permission_hash, permission_hash, Address, PermissionEvent, PermissionId,
    PermissionValue, ADDRESS_LEN,
};
use crate::{Error, Result};

pub const SLED_PERMISSIONS_TREE: &[u8] = b"_permissions";
pub const SLED_FROZEN_PERMISSIONS_TREE: &[u8] = b"_frozen_permissions";
pub const SLED_PERMISSION_EVENTS_TREE: &[u8] = b"_permission_events";
pub const SLED_PERMISSION_MANAGER_TREE: &[u8] = b"_permission_manager";

const FROZEN_MARKER: &[u8] = &[0x01];

/// Read access to permission state. Implemented by the committed
/// [`PermissionStore`] and by [`PermissionStoreOverlay`], so evaluation
/// works the same way inside and outside of a pending mutation.
pub trait PermissionReader {
    /// Fetch the record for `actor` holding `permission_id` on `target`.
    fn get(
        &self,
        target: &Address,
        actor: &Address,
        permission_id: &PermissionId,
    ) -> Result<PermissionValue>;

    /// Whether `permission_id` on `target` is frozen.
    fn get_frozen(&self, target: &Address, permission_id: &PermissionId) -> Result<bool>;
}

fn parse_flag(value: Option<IVec>) -> Result<PermissionValue> {
    let Some(value) = value else { return Ok(PermissionValue::Unset) };

    let Ok(flag) = <[u8; ADDRESS_LEN]>::try_from(value.as_ref()) else {
        return Err(Error::DatabaseError(format!("Corrupted permission record: {value:?}")))
    };

    Ok(PermissionValue::from_flag(Address::new(flag)))
}

/// The `PermissionStore` is a structure representing all `sled` trees
/// holding permission state.
#[derive(Clone)]
pub struct PermissionStore {
    /// Main pointer to the sled db connection
    pub sled_db: sled::Db,
    /// The `sled` tree storing permission records.
    /// The layout looks like this:
    /// ```plaintext
    ///  tree: "_permissions"
    ///   key: keccak256("PERMISSION" || actor || target || permission_id)
    /// value: 20 byte flag (ALLOW_FLAG or oracle address)
    /// ```
    /// Unset records are not stored.
    pub permissions: sled::Tree,
    /// The `sled` tree storing freeze flags.
    /// The layout looks like this:
    /// ```plaintext
    ///  tree: "_frozen_permissions"
    ///   key: keccak256("IMMUTABLE" || target || permission_id)
    /// value: 0x01
    /// ```
    /// Entries are never removed.
    pub frozen: sled::Tree,
    /// The `sled` tree journaling every effective state change.
    /// The layout looks like this:
    /// ```plaintext
    ///  tree: "_permission_events"
    ///   key: u64 sequence number (big endian)
    /// value: serialized PermissionEvent
    /// ```
    /// Sequence numbers come from [`sled::Db::generate_id`], so they
    /// increase across every manager sharing the database but may skip.
    pub events: sled::Tree,
    /// The `sled` tree storing the initialization marker of each manager.
    /// The layout looks like this:
    /// ```plaintext
    ///  tree: "_permission_manager"
    ///   key: manager address
    /// value: 0x01
    /// ```
    pub manager: sled::Tree,
}

impl PermissionStore {
    /// Opens a new or existing `PermissionStore` on the given sled database.
    pub fn new(db: &sled::Db) -> Result<Self> {
        let permissions = db.open_tree(SLED_PERMISSIONS_TREE)?;
        let frozen = db.open_tree(SLED_FROZEN_PERMISSIONS_TREE)?;
        let events = db.open_tree(SLED_PERMISSION_EVENTS_TREE)?;
        let manager = db.open_tree(SLED_PERMISSION_MANAGER_TREE)?;
        Ok(Self { sled_db: db.clone(), permissions, frozen, events, manager })
    }

    /// Whether the manager at `here` went through `init()`.
    pub fn is_initialized(&self, here: &Address) -> Result<bool> {
        Ok(self.manager.contains_key(here.as_bytes())?)
    }

    /// Number of non-unset permission records.
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Number of journaled events.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Retrieve all journaled events with a sequence number of at least
    /// `from`, in order.
    pub fn events_since(&self, from: u64) -> Result<Vec<(u64, PermissionEvent)>> {
        let mut ret = vec![];

        for record in self.events.range(from.to_be_bytes()..) {
            let (key, value) = record?;
            let Ok(seq) = <[u8; 8]>::try_from(key.as_ref()) else {
                return Err(Error::DatabaseError(format!("Corrupted event sequence: {key:?}")))
            };
            ret.push((u64::from_be_bytes(seq), deserialize(&value)?));
        }

        Ok(ret)
    }
}

impl PermissionReader for PermissionStore {
    fn get(
        &self,
        target: &Address,
        actor: &Address,
        permission_id: &PermissionId,
    ) -> Result<PermissionValue> {
        parse_flag(self.permissions.get(permission_hash(target, actor, permission_id))?)
    }

    fn get_frozen(&self, target: &Address, permission_id: &PermissionId) -> Result<bool> {
        Ok(self.frozen.contains_key(frozen_permission_hash(target, permission_id))?)
    }
}

/// Overlay structure over a [`PermissionStore`] instance.
/// All writes stay in memory until [`PermissionStoreOverlay::apply`]
/// commits them in a single sled transaction. Dropping the overlay
/// discards them.
pub struct PermissionStoreOverlay {
    sled_db: sled::Db,
    overlay: SledDbOverlay,
}

impl PermissionStoreOverlay {
    /// Instantiate a new `PermissionStoreOverlay` over the given [`PermissionStore`].
    pub fn new(store: &PermissionStore) -> Result<Self> {
        let protected_trees = vec![
            SLED_PERMISSIONS_TREE,
            SLED_FROZEN_PERMISSIONS_TREE,
            SLED_PERMISSION_EVENTS_TREE,
            SLED_PERMISSION_MANAGER_TREE,
        ];
        let mut overlay = SledDbOverlay::new(&store.sled_db, protected_trees);

        overlay.open_tree(SLED_PERMISSIONS_TREE, true)?;
        overlay.open_tree(SLED_FROZEN_PERMISSIONS_TREE, true)?;
        overlay.open_tree(SLED_PERMISSION_EVENTS_TREE, true)?;
        overlay.open_tree(SLED_PERMISSION_MANAGER_TREE, true)?;

        Ok(Self { sled_db: store.sled_db.clone(), overlay })
    }

    /// Write a permission record. Writing [`PermissionValue::Unset`]
    /// removes the record.
    pub fn set(
        &mut self,
        target: &Address,
        actor: &Address,
        permission_id: &PermissionId,
        value: PermissionValue,
    ) -> Result<()> {
        let key = permission_hash(target, actor, permission_id);
        match value {
            PermissionValue::Unset => {
                self.overlay.remove(SLED_PERMISSIONS_TREE, &key)?;
            }
            value => {
                self.overlay.insert(SLED_PERMISSIONS_TREE, &key, value.to_flag().as_bytes())?;
            }
        }
        Ok(())
    }

    /// Raise the freeze flag of `permission_id` on `target`.
    pub fn set_frozen(&mut self, target: &Address, permission_id: &PermissionId) -> Result<()> {
        let key = frozen_permission_hash(target, permission_id);
        self.overlay.insert(SLED_FROZEN_PERMISSIONS_TREE, &key, FROZEN_MARKER)?;
        Ok(())
    }

    pub fn is_initialized(&self, here: &Address) -> Result<bool> {
        Ok(self.overlay.get(SLED_PERMISSION_MANAGER_TREE, here.as_bytes())?.is_some())
    }

    pub fn set_initialized(&mut self, here: &Address) -> Result<()> {
        self.overlay.insert(SLED_PERMISSION_MANAGER_TREE, here.as_bytes(), &[0x01])?;
        Ok(())
    }

    /// Journal an event, returning its sequence number. Numbers are
    /// drawn from the database, so overlays staged concurrently by
    /// different managers never reuse one.
    pub fn append_event(&mut self, event: &PermissionEvent) -> Result<u64> {
        let seq = self.sled_db.generate_id()?;
        self.overlay.insert(SLED_PERMISSION_EVENTS_TREE, &seq.to_be_bytes(), &serialize(event))?;
        Ok(seq)
    }

    /// Commit every staged write to the underlying database.
    pub fn apply(mut self) -> Result<()> {
        debug!(target: "permission::store::apply", "Applying permission overlay");
        self.overlay.apply()?;
        Ok(())
    }
}

impl PermissionReader for PermissionStoreOverlay {
    fn get(
        &self,
        target: &Address,
        actor: &Address,
        permission_id: &PermissionId,
    ) -> Result<PermissionValue> {
        let key = permission_hash(target, actor, permission_id);
        parse_flag(self.overlay.get(SLED_PERMISSIONS_TREE, &key)?)
    }

    fn get_frozen(&self, target: &Address, permission_id: &PermissionId) -> Result<bool> {
        let key = frozen_permission_hash(target, permission_id);
        Ok(self.overlay.get(SLED_FROZEN_PERMISSIONS_TREE, &key)?.is_some())
    }
}
