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

use std::{fmt, str::FromStr};

use darkfi_serial::{SerialDecodable, SerialEncodable};
use lazy_static::lazy_static;
use tiny_keccak::{Hasher, Keccak};

use crate::{Error, Result};

/// Byte length of an [`Address`]
pub const ADDRESS_LEN: usize = 20;

/// Wildcard address. Matches any actor when used as the actor and any
/// target when used as the target.
pub const ANY_ADDR: Address = Address([0xff; ADDRESS_LEN]);

/// Stored flag meaning no grant exists.
pub const UNSET_FLAG: Address = Address([0x00; ADDRESS_LEN]);

/// Stored flag meaning an unconditional grant.
pub const ALLOW_FLAG: Address =
    Address([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x02]);

lazy_static! {
    /// The permission authorizing every mutation on a target.
    pub static ref ROOT_PERMISSION_ID: PermissionId = PermissionId::from_name("ROOT_PERMISSION");
}

/// 160-bit identifier of a target, an actor, or an oracle.
#[derive(
    Copy, Clone, Debug, Eq, Ord, PartialEq, PartialOrd, Hash, SerialEncodable, SerialDecodable,
)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    pub fn inner(&self) -> [u8; ADDRESS_LEN] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Whether this is the `ANY_ADDR` wildcard
    pub fn is_any(&self) -> bool {
        *self == ANY_ADDR
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        let Ok(bytes) = <[u8; ADDRESS_LEN]>::try_from(bytes.as_slice()) else {
            return Err(Error::ParseFailed("Address must be 20 bytes long"))
        };
        Ok(Self(bytes))
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

/// 256-bit permission identifier, the keccak256 hash of the permission name.
#[derive(
    Copy, Clone, Debug, Eq, Ord, PartialEq, PartialOrd, Hash, SerialEncodable, SerialDecodable,
)]
pub struct PermissionId([u8; 32]);

impl PermissionId {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive the identifier of a named permission, `keccak256(name)`.
    pub fn from_name(name: &str) -> Self {
        let mut keccak = Keccak::v256();
        keccak.update(name.as_bytes());
        let mut id = [0u8; 32];
        keccak.finalize(&mut id);
        Self(id)
    }

    pub fn inner(&self) -> [u8; 32] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse either a `0x`-prefixed 32 byte hex identifier, or hash the
    /// given string as a permission name.
    pub fn parse(s: &str) -> Result<Self> {
        if s.starts_with("0x") && s.len() == 66 {
            return Self::from_str(s)
        }
        Ok(Self::from_name(s))
    }
}

impl fmt::Display for PermissionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for PermissionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        let Ok(bytes) = <[u8; 32]>::try_from(bytes.as_slice()) else {
            return Err(Error::ParseFailed("PermissionId must be 32 bytes long"))
        };
        Ok(Self(bytes))
    }
}

/// Current value of a permission record.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, SerialEncodable, SerialDecodable)]
pub enum PermissionValue {
    Unset,
    Allow,
    Oracle(Address),
}

impl PermissionValue {
    /// Decode the stored flag address. Anything other than the
    /// unset and allow flags references an oracle.
    pub fn from_flag(flag: Address) -> Self {
        if flag == UNSET_FLAG {
            Self::Unset
        } else if flag == ALLOW_FLAG {
            Self::Allow
        } else {
            Self::Oracle(flag)
        }
    }

    pub fn to_flag(&self) -> Address {
        match self {
            Self::Unset => UNSET_FLAG,
            Self::Allow => ALLOW_FLAG,
            Self::Oracle(oracle) => *oracle,
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }
}

impl fmt::Display for PermissionValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "UNSET"),
            Self::Allow => write!(f, "ALLOW"),
            Self::Oracle(oracle) => write!(f, "oracle {}", oracle),
        }
    }
}

/// A single mutation inside a bulk batch.
#[derive(Copy, Clone, Debug, Eq, PartialEq, SerialEncodable, SerialDecodable)]
pub enum PermissionOperation {
    Grant,
    Revoke,
    /// The actor of the enclosing item is ignored.
    Freeze,
    GrantWithOracle(Address),
}

/// Bulk item applied on the target given to `bulk_on_single_target()`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, SerialEncodable, SerialDecodable)]
pub struct SingleTargetPermission {
    pub operation: PermissionOperation,
    pub actor: Address,
    pub permission_id: PermissionId,
}

/// Bulk item carrying its own target, used by `bulk_on_multi_target()`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, SerialEncodable, SerialDecodable)]
pub struct MultiTargetPermission {
    pub operation: PermissionOperation,
    pub target: Address,
    pub actor: Address,
    pub permission_id: PermissionId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_decode() {
        assert_eq!(PermissionValue::from_flag(UNSET_FLAG), PermissionValue::Unset);
        assert_eq!(PermissionValue::from_flag(ALLOW_FLAG), PermissionValue::Allow);

        let oracle = Address::new([7; ADDRESS_LEN]);
        assert_eq!(PermissionValue::from_flag(oracle), PermissionValue::Oracle(oracle));
        assert_eq!(PermissionValue::Oracle(oracle).to_flag(), oracle);
        assert_eq!(PermissionValue::Allow.to_flag(), ALLOW_FLAG);
    }

    #[test]
    fn address_strings() -> Result<()> {
        let addr = Address::from_str("0x00000000000000000000000000000000000000ff")?;
        assert_eq!(addr.inner()[19], 0xff);
        assert_eq!(addr.to_string(), "0x00000000000000000000000000000000000000ff");
        assert_eq!(Address::from_str(&ANY_ADDR.to_string())?, ANY_ADDR);
        assert!(ANY_ADDR.is_any());

        assert!(Address::from_str("0x1234").is_err());
        assert!(Address::from_str("0xzz").is_err());
        Ok(())
    }

    #[test]
    fn permission_ids() -> Result<()> {
        // ethers.utils.id("ROOT_PERMISSION")
        assert_eq!(
            ROOT_PERMISSION_ID.to_string(),
            "0x815fe80e4b37c8582a3b773d1d7071f983eacfd56b5965db654f3087c25ada33"
        );

        let admin = PermissionId::from_name("ADMIN_PERMISSION");
        assert_eq!(PermissionId::parse("ADMIN_PERMISSION")?, admin);
        assert_eq!(PermissionId::parse(&admin.to_string())?, admin);
        assert_ne!(admin, *ROOT_PERMISSION_ID);
        Ok(())
    }
}
