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

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use darkfi_serial::deserialize;
use log::{debug, warn};
use smol::lock::RwLock;

use super::{Address, PermissionId, ALLOW_FLAG, ANY_ADDR, UNSET_FLAG};
use crate::{system::timeout, Error, Result};

/// Runtime condition attached to a grant. A record holding an oracle
/// address is only honoured when the oracle registered at that address
/// decides so.
///
/// Oracles get no handle to the permission manager, so they can not
/// mutate permissions while a check is in flight.
#[async_trait]
pub trait PermissionOracle: Send + Sync {
    async fn decide(
        &self,
        target: &Address,
        actor: &Address,
        permission_id: &PermissionId,
        data: &[u8],
    ) -> Result<bool>;
}

pub type PermissionOraclePtr = Arc<dyn PermissionOracle>;

/// Maps oracle addresses found in permission records to implementations.
#[derive(Default)]
pub struct OracleRegistry {
    oracles: RwLock<HashMap<Address, PermissionOraclePtr>>,
}

impl OracleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `oracle` at `address`, replacing any previous one.
    /// Flag addresses can not host an oracle.
    pub async fn register(&self, address: Address, oracle: PermissionOraclePtr) -> Result<()> {
        if address == UNSET_FLAG || address == ALLOW_FLAG || address == ANY_ADDR {
            return Err(Error::InvalidOracle(address))
        }

        debug!(target: "permission::oracle::register", "Registering oracle at {}", address);
        self.oracles.write().await.insert(address, oracle);
        Ok(())
    }

    pub async fn unregister(&self, address: &Address) -> Option<PermissionOraclePtr> {
        self.oracles.write().await.remove(address)
    }

    pub async fn get(&self, address: &Address) -> Option<PermissionOraclePtr> {
        self.oracles.read().await.get(address).cloned()
    }

    /// Ask the oracle registered at `oracle` for a decision, giving up
    /// after `oracle_timeout`.
    pub async fn query(
        &self,
        oracle: &Address,
        oracle_timeout: Duration,
        target: &Address,
        actor: &Address,
        permission_id: &PermissionId,
        data: &[u8],
    ) -> Result<bool> {
        let Some(oracle_impl) = self.get(oracle).await else {
            warn!(target: "permission::oracle::query", "No oracle registered at {}", oracle);
            return Err(Error::OracleNotRegistered(*oracle))
        };

        let decision = oracle_impl.decide(target, actor, permission_id, data);

        match timeout(oracle_timeout, decision).await {
            Some(decision) => decision,
            None => {
                warn!(
                    target: "permission::oracle::query",
                    "Oracle {} timed out after {:?}", oracle, oracle_timeout,
                );
                Err(Error::OracleTimeout(*oracle))
            }
        }
    }
}

/// Oracle granting every request.
pub struct AllowOracle;

#[async_trait]
impl PermissionOracle for AllowOracle {
    async fn decide(&self, _: &Address, _: &Address, _: &PermissionId, _: &[u8]) -> Result<bool> {
        Ok(true)
    }
}

/// Oracle denying every request.
pub struct DenyOracle;

#[async_trait]
impl PermissionOracle for DenyOracle {
    async fn decide(&self, _: &Address, _: &Address, _: &PermissionId, _: &[u8]) -> Result<bool> {
        Ok(false)
    }
}

/// Oracle whose answer can be switched at runtime.
pub struct ToggleOracle {
    will_perform: AtomicBool,
}

impl ToggleOracle {
    pub fn new(will_perform: bool) -> Arc<Self> {
        Arc::new(Self { will_perform: AtomicBool::new(will_perform) })
    }

    pub fn set_will_perform(&self, will_perform: bool) {
        self.will_perform.store(will_perform, Ordering::SeqCst);
    }
}

#[async_trait]
impl PermissionOracle for ToggleOracle {
    async fn decide(&self, _: &Address, _: &Address, _: &PermissionId, _: &[u8]) -> Result<bool> {
        Ok(self.will_perform.load(Ordering::SeqCst))
    }
}

/// Oracle allowing only requests whose context data is the serialized
/// `u64` object id it was created with.
pub struct IdGatingOracle {
    allowed_id: u64,
}

impl IdGatingOracle {
    pub fn new(allowed_id: u64) -> Self {
        Self { allowed_id }
    }
}

#[async_trait]
impl PermissionOracle for IdGatingOracle {
    async fn decide(&self, _: &Address, _: &Address, _: &PermissionId, data: &[u8]) -> Result<bool> {
        let Ok(id) = deserialize::<u64>(data) else {
            return Err(Error::OracleFailed("Context data is not an object id".to_string()))
        };
        Ok(id == self.allowed_id)
    }
}

/// Oracle deciding through a closure over the full request.
pub struct ContextOracle<F> {
    decide_fn: F,
}

impl<F> ContextOracle<F>
where
    F: Fn(&Address, &Address, &PermissionId, &[u8]) -> bool + Send + Sync,
{
    pub fn new(decide_fn: F) -> Self {
        Self { decide_fn }
    }
}

#[async_trait]
impl<F> PermissionOracle for ContextOracle<F>
where
    F: Fn(&Address, &Address, &PermissionId, &[u8]) -> bool + Send + Sync,
{
    async fn decide(
        &self,
        target: &Address,
        actor: &Address,
        permission_id: &PermissionId,
        data: &[u8],
    ) -> Result<bool> {
        Ok((self.decide_fn)(target, actor, permission_id, data))
    }
}

#[cfg(test)]
mod tests {
    use darkfi_serial::serialize;

    use super::*;
    use crate::permission::ROOT_PERMISSION_ID;

    /// Oracle that never answers
    struct StuckOracle;

    #[async_trait]
    impl PermissionOracle for StuckOracle {
        async fn decide(&self, _: &Address, _: &Address, _: &PermissionId, _: &[u8]) -> Result<bool> {
            smol::future::pending::<()>().await;
            Ok(true)
        }
    }

    #[test]
    fn oracle_registry() {
        smol::block_on(async {
            let registry = OracleRegistry::new();
            let target = Address::new([1; 20]);
            let actor = Address::new([2; 20]);
            let timeout = Duration::from_millis(100);

            let toggle_addr = Address::new([10; 20]);
            let gate_addr = Address::new([11; 20]);
            let stuck_addr = Address::new([12; 20]);

            let toggle = ToggleOracle::new(true);
            registry.register(toggle_addr, toggle.clone()).await.unwrap();
            registry.register(gate_addr, Arc::new(IdGatingOracle::new(3))).await.unwrap();
            registry.register(stuck_addr, Arc::new(StuckOracle)).await.unwrap();

            assert!(matches!(
                registry.register(ALLOW_FLAG, Arc::new(AllowOracle)).await,
                Err(Error::InvalidOracle(_))
            ));

            let id = *ROOT_PERMISSION_ID;
            assert!(registry.query(&toggle_addr, timeout, &target, &actor, &id, &[]).await.unwrap());
            toggle.set_will_perform(false);
            assert!(!registry.query(&toggle_addr, timeout, &target, &actor, &id, &[]).await.unwrap());

            let data = serialize(&3u64);
            assert!(registry.query(&gate_addr, timeout, &target, &actor, &id, &data).await.unwrap());
            let data = serialize(&4u64);
            assert!(!registry.query(&gate_addr, timeout, &target, &actor, &id, &data).await.unwrap());
            assert!(matches!(
                registry.query(&gate_addr, timeout, &target, &actor, &id, &[1]).await,
                Err(Error::OracleFailed(_))
            ));

            assert!(matches!(
                registry.query(&stuck_addr, timeout, &target, &actor, &id, &[]).await,
                Err(Error::OracleTimeout(a)) if a == stuck_addr
            ));

            let unknown = Address::new([13; 20]);
            assert!(matches!(
                registry.query(&unknown, timeout, &target, &actor, &id, &[]).await,
                Err(Error::OracleNotRegistered(a)) if a == unknown
            ));

            assert!(registry.unregister(&toggle_addr).await.is_some());
            assert!(registry.get(&toggle_addr).await.is_none());
        });
    }
}
