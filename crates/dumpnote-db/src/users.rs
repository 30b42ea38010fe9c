//! User repository implementation.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, trace, warn};

use dumpnote_core::{
    logging, Error, NewUser, Predicate, Result, SqlValue, User, UserChanges, UserRepository,
};

use crate::cache::IdentityCache;
use crate::executor::Executor;
use crate::row::QueryResult;
use crate::schema::USERS;
use crate::table::Table;
use crate::RepositoryConfig;

/// PostgreSQL implementation of UserRepository.
///
/// Resolved users are kept in a shared [`IdentityCache`]; clones of the
/// repository see the same cache.
#[derive(Clone)]
pub struct PgUserRepository {
    executor: Arc<dyn Executor>,
    cache: Arc<IdentityCache>,
    config: RepositoryConfig,
}

impl PgUserRepository {
    pub fn new(executor: Arc<dyn Executor>, config: RepositoryConfig) -> Self {
        Self {
            cache: Arc::new(IdentityCache::new(config.user_cache_capacity)),
            executor,
            config,
        }
    }

    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    fn table(&self) -> Table<'_> {
        Table::new(self.executor.as_ref(), &USERS)
    }

    async fn fetch_one(&self, predicate: Predicate) -> Result<Option<User>> {
        let result: QueryResult = self
            .table()
            .select(&["*"])
            .filter(predicate)
            .limit(1)
            .execute()
            .await?;
        result.decode_first()
    }

    /// Read by gid and cache the row if nothing was invalidated meanwhile.
    async fn load_by_gid(&self, gid: &str) -> Result<Option<User>> {
        let epoch = self.cache.epoch().await;
        let user = self.fetch_one(Predicate::eq("gid", gid)).await?;
        if let Some(user) = &user {
            self.cache.insert_if_current(user.clone(), epoch).await;
        }
        Ok(user)
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn resolve(&self, id: i64) -> Result<Option<User>> {
        if let Some(user) = self.cache.get_by_id(id).await {
            trace!(
                { logging::SUBSYSTEM } = "db",
                { logging::COMPONENT } = "users",
                { logging::USER_ID } = id,
                "Identity cache hit"
            );
            return Ok(Some(user));
        }
        trace!(
            { logging::SUBSYSTEM } = "db",
            { logging::COMPONENT } = "users",
            { logging::USER_ID } = id,
            "Identity cache miss"
        );

        let epoch = self.cache.epoch().await;
        let user = self.fetch_one(Predicate::eq("id", id)).await?;
        if let Some(user) = &user {
            self.cache.insert_if_current(user.clone(), epoch).await;
        }
        Ok(user)
    }

    async fn create_or_get(&self, new_user: NewUser) -> Result<User> {
        if let Some(user) = self.cache.get_by_gid(&new_user.gid).await {
            trace!(
                { logging::SUBSYSTEM } = "db",
                { logging::COMPONENT } = "users",
                { logging::USER_ID } = user.id,
                "Identity cache hit"
            );
            return Ok(user);
        }
        if let Some(user) = self.load_by_gid(&new_user.gid).await? {
            return Ok(user);
        }

        let table = self.table();
        let attempts = self.config.id_allocation_attempts.max(1);
        let values = |id: i64| {
            vec![
                SqlValue::Int(id),
                SqlValue::from(new_user.name.as_str()),
                SqlValue::from(new_user.email.as_str()),
                SqlValue::from(new_user.gid.as_str()),
            ]
        };
        for attempt in 1..=attempts {
            match table.allocate_and_insert(&values).await {
                Ok(id) => {
                    let user = User {
                        id,
                        name: new_user.name.clone(),
                        email: new_user.email.clone(),
                        gid: new_user.gid.clone(),
                    };
                    self.cache.insert(user.clone()).await;
                    info!(
                        { logging::SUBSYSTEM } = "db",
                        { logging::COMPONENT } = "users",
                        { logging::OPERATION } = "create",
                        { logging::USER_ID } = id,
                        "User created"
                    );
                    return Ok(user);
                }
                Err(e) if e.is_unique_violation() => {
                    // A concurrent login created this gid first.
                    if let Some(user) = self.load_by_gid(&new_user.gid).await? {
                        debug!(
                            { logging::SUBSYSTEM } = "db",
                            { logging::COMPONENT } = "users",
                            { logging::USER_ID } = user.id,
                            "Concurrent login created the user first"
                        );
                        return Ok(user);
                    }
                    warn!(
                        { logging::SUBSYSTEM } = "db",
                        { logging::COMPONENT } = "users",
                        { logging::OPERATION } = "allocate_id",
                        { logging::ATTEMPT } = attempt,
                        "User id already taken, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::Conflict(format!(
            "Could not allocate a user id after {} attempts",
            attempts
        )))
    }

    async fn edit(&self, id: i64, changes: UserChanges) -> Result<()> {
        let result = self
            .table()
            .update(&Predicate::eq("id", id), &changes.assignments())
            .await;
        // Invalidate even on failure; the write may have reached the server.
        self.cache.invalidate(id).await;
        if result?.row_count == 0 {
            return Err(Error::NotFound(format!("User {} not found", id)));
        }
        debug!(
            { logging::SUBSYSTEM } = "db",
            { logging::COMPONENT } = "users",
            { logging::OPERATION } = "edit",
            { logging::USER_ID } = id,
            "User updated"
        );
        Ok(())
    }

    async fn next_id(&self) -> Result<i64> {
        self.table().next_id().await
    }
}
