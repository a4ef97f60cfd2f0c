//! Delegation management and scope evaluation.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use tessera_core::{AppError, AppResult, EntityKind};
use tessera_domain::{Delegation, DelegationScope};

use crate::dispatcher::ChangeDispatcher;
use crate::events::PermissionChangeEvent;
use crate::ports::{DelegationRepository, NewDelegation, UserRepository};

/// Input payload for creating a delegation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDelegationInput {
    /// User granting access.
    pub delegator_id: String,
    /// User receiving access.
    pub delegatee_id: String,
    /// Scope of the transferred access.
    pub scope: DelegationScope,
    /// Optional resource-type restriction.
    pub resource_type: Option<String>,
    /// Optional resource-id allow-list.
    pub resource_ids: Option<Vec<String>>,
    /// Optional end of the validity window; `None` delegates until revoked.
    pub valid_until: Option<DateTime<Utc>>,
}

/// Both directions of a user's delegations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelegationsSummary {
    /// Active delegations the user created.
    pub given: Vec<Delegation>,
    /// Active delegations the user received.
    pub received: Vec<Delegation>,
}

/// Application service for user-to-user delegations.
#[derive(Clone)]
pub struct DelegationService {
    delegations: Arc<dyn DelegationRepository>,
    users: Arc<dyn UserRepository>,
    dispatcher: ChangeDispatcher,
}

impl DelegationService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        delegations: Arc<dyn DelegationRepository>,
        users: Arc<dyn UserRepository>,
        dispatcher: ChangeDispatcher,
    ) -> Self {
        Self {
            delegations,
            users,
            dispatcher,
        }
    }

    /// Creates a delegation starting now.
    pub async fn create_delegation(&self, input: CreateDelegationInput) -> AppResult<Delegation> {
        self.users
            .find_active(&input.delegatee_id)
            .await?
            .ok_or_else(|| AppError::not_found(EntityKind::User, input.delegatee_id.as_str()))?;

        let delegation = self
            .delegations
            .insert(NewDelegation {
                delegator_id: input.delegator_id,
                delegatee_id: input.delegatee_id,
                scope: input.scope,
                resource_type: input.resource_type,
                resource_ids: input.resource_ids,
                valid_from: Utc::now(),
                valid_until: input.valid_until,
            })
            .await?;

        self.dispatcher
            .dispatch(PermissionChangeEvent::delegation_created(&delegation));

        Ok(delegation)
    }

    /// Revokes a delegation by row id.
    pub async fn revoke_delegation(&self, id: i64, revoked_by: &str) -> AppResult<()> {
        let mut delegation = self
            .delegations
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(EntityKind::Delegation, id.to_string()))?;

        delegation.revoke(revoked_by, Utc::now());
        self.delegations.update(&delegation).await?;

        self.dispatcher
            .dispatch(PermissionChangeEvent::delegation_revoked(&delegation));

        Ok(())
    }

    /// Returns the user's active delegations in both directions.
    pub async fn delegations_for(&self, user_id: &str) -> AppResult<DelegationsSummary> {
        let now = Utc::now();
        let given = self
            .delegations
            .find_active_by_delegator(user_id, now)
            .await?;
        let received = self
            .delegations
            .find_active_for_delegatee(user_id, now)
            .await?;

        Ok(DelegationsSummary { given, received })
    }

    /// Returns whether any active delegation grants the delegatee the
    /// requested access. Pure read; short-circuits on the first match.
    pub async fn has_delegated_access(
        &self,
        delegatee_id: &str,
        resource_type: &str,
        resource_id: &str,
        permission: &str,
    ) -> AppResult<bool> {
        let delegations = self
            .delegations
            .find_active_for_delegatee(delegatee_id, Utc::now())
            .await?;

        Ok(delegations
            .iter()
            .any(|delegation| delegation.covers(resource_type, resource_id, permission)))
    }
}
