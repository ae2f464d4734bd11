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

//! Storage keys for permission records and freeze flags.
//!
//! Both are computed exactly like the on-chain permission manager does,
//! so external indexers can derive them on their own:
//!
//! ```plaintext
//! record key: keccak256("PERMISSION" || actor || target || permission_id)
//! freeze key: keccak256("IMMUTABLE" || target || permission_id)
//! ```
//!
//! Addresses are the raw 20 bytes and the identifier is the raw 32 bytes,
//! with no length prefixes (`abi.encodePacked`).

use tiny_keccak::{Hasher, Keccak};

use super::{Address, PermissionId};

const PERMISSION_PREFIX: &[u8] = b"PERMISSION";
const IMMUTABLE_PREFIX: &[u8] = b"IMMUTABLE";

/// Storage key of the record for `actor` holding `permission_id` on `target`.
pub fn permission_hash(target: &Address, actor: &Address, permission_id: &PermissionId) -> [u8; 32] {
    let mut keccak = Keccak::v256();
    keccak.update(PERMISSION_PREFIX);
    keccak.update(actor.as_bytes());
    keccak.update(target.as_bytes());
    keccak.update(permission_id.as_bytes());

    let mut hash = [0u8; 32];
    keccak.finalize(&mut hash);
    hash
}

/// Storage key of the freeze flag of `permission_id` on `target`.
pub fn frozen_permission_hash(target: &Address, permission_id: &PermissionId) -> [u8; 32] {
    let mut keccak = Keccak::v256();
    keccak.update(IMMUTABLE_PREFIX);
    keccak.update(target.as_bytes());
    keccak.update(permission_id.as_bytes());

    let mut hash = [0u8; 32];
    keccak.finalize(&mut hash);
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::ROOT_PERMISSION_ID;

    #[test]
    fn hash_permissions() {
        let actor = Address::new([0x11; 20]);
        let target = Address::new([0x22; 20]);

        assert_eq!(
            hex::encode(permission_hash(&target, &actor, &ROOT_PERMISSION_ID)),
            "2b60648e37784314e82a2a989c58ae0f55e4e268cbcef7f3e8d819cae4c8b398"
        );

        // Actor and target are not interchangeable
        assert_ne!(
            permission_hash(&target, &actor, &ROOT_PERMISSION_ID),
            permission_hash(&actor, &target, &ROOT_PERMISSION_ID)
        );
    }

    #[test]
    fn hash_immutable() {
        let target = Address::new([0x22; 20]);

        assert_eq!(
            hex::encode(frozen_permission_hash(&target, &ROOT_PERMISSION_ID)),
            "34c30d09dd5f15e55fa00a8aebea086bc44b32c320710a3706ac83a9345d46bf"
        );
    }
}
