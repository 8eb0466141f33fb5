//! Postgres database clients lazily acquiring [`Connection`]s from a
//! [`connection::Pool`].

use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard};
use tokio_postgres::{types::ToSql, Row, ToStatement};
use tracerr::Traced;

use crate::infra::database::{
    self,
    postgres::{self, connection, Connection},
};

/// Implements [`Connection`] for a client type by delegating every call to
/// the [`Connection`] returned by its `connection()` method.
macro_rules! delegate_connection {
    ($client:ty) => {
        impl Connection for $client {
            async fn query<T>(
                &self,
                stmt: &T,
                params: &[&(dyn ToSql + Sync)],
            ) -> Result<Vec<Row>, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .query(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }

            async fn query_opt<T>(
                &self,
                stmt: &T,
                params: &[&(dyn ToSql + Sync)],
            ) -> Result<Option<Row>, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .query_opt(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }

            async fn query_one<T>(
                &self,
                stmt: &T,
                params: &[&(dyn ToSql + Sync)],
            ) -> Result<Row, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .query_one(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }

            async fn exec<T>(
                &self,
                stmt: &T,
                params: &[&(dyn ToSql + Sync)],
            ) -> Result<u64, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .exec(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }
        }
    };
}

/// Lazily initialized slot of a pooled [`Connection`].
type Slot<C> = RwLock<Option<C>>;

/// Returns the [`Connection`] stored in the provided `slot`, initializing it
/// with the `init` one first, if there is none yet.
async fn get_or_init<C, F>(
    slot: &Slot<C>,
    init: impl FnOnce() -> F,
) -> Result<RwLockReadGuard<'_, C>, Traced<database::Error>>
where
    F: std::future::Future<Output = Result<C, Traced<database::Error>>>,
{
    let connection = slot.read().await;
    let guard = if connection.is_none() {
        drop(connection);

        let mut connection = slot.write().await;
        if connection.is_none() {
            *connection = Some(init().await.map_err(tracerr::wrap!())?);
        }

        connection.downgrade()
    } else {
        connection
    };

    Ok(RwLockReadGuard::map(guard, |conn| {
        conn.as_ref()
            .expect("connection cannot be dropped while guard is alive")
    }))
}

/// Acquires a new [`connection::NonTx`] from the provided
/// [`connection::Pool`].
async fn acquire(
    pool: &connection::Pool,
) -> Result<connection::NonTx, Traced<database::Error>> {
    pool.get()
        .await
        .map_err(tracerr::from_and_wrap!(=> postgres::Error))
        .map_err(tracerr::map_from)
}

/// Non-transactional Postgres database client.
#[derive(Clone, Debug)]
pub struct NonTx {
    /// [`connection::Pool`] to initialize the client.
    pub(crate) pool: connection::Pool,

    /// Client to be used for non-transactional operations, if any.
    connection: Arc<Slot<connection::NonTx>>,
}

impl NonTx {
    /// Creates a new [`NonTx`] client from the provided [`connection::Pool`].
    #[must_use]
    pub(crate) fn from_pool(pool: connection::Pool) -> Self {
        Self {
            pool,
            connection: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the underlying [`Connection`] of this [`NonTx`] client.
    async fn connection(
        &self,
    ) -> Result<RwLockReadGuard<'_, connection::NonTx>, Traced<database::Error>>
    {
        get_or_init(&self.connection, || acquire(&self.pool)).await
    }

    /// Takes the underlying [`Connection`] from this [`NonTx`] client.
    ///
    /// Next time this [`NonTx`] client is used, it will acquire a new
    /// [`Connection`].
    async fn take_connection(&self) -> Option<connection::NonTx> {
        self.connection.write().await.take()
    }
}

delegate_connection!(NonTx);

/// Transactional Postgres database client.
///
/// The transaction is started lazily on the first operation, reusing the
/// [`Connection`] already held by the [`NonTx`] client it was created from.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`connection::Pool`] to retrieve the [`Connection`] from.
    pool: connection::Pool,

    /// [`NonTx`] client to take the [`Connection`] from, if any.
    non_tx: Arc<RwLock<Option<NonTx>>>,

    /// Lazily started [`connection::Tx`].
    tx: Arc<Slot<connection::Tx>>,
}

impl Tx {
    /// Creates a new [`Tx`] client from the provided [`NonTx`] client.
    #[must_use]
    pub fn from_non_tx(client: NonTx) -> Self {
        Self {
            pool: client.pool.clone(),
            non_tx: Arc::new(RwLock::new(Some(client))),
            tx: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the underlying [`Connection`] of this [`Tx`] client.
    async fn connection(
        &self,
    ) -> Result<RwLockReadGuard<'_, connection::Tx>, Traced<database::Error>>
    {
        get_or_init(&self.tx, || async {
            let existing = match self.non_tx.write().await.take() {
                Some(cl) => cl.take_connection().await,
                None => None,
            };
            let conn = match existing {
                Some(c) => c,
                None => acquire(&self.pool).await.map_err(tracerr::wrap!())?,
            };
            connection::Tx::from_non_tx(conn)
                .await
                .map_err(tracerr::wrap!())
        })
        .await
    }

    /// Commits this [`Tx`] client.
    ///
    /// # Errors
    ///
    /// If failed to commit transaction of this [`Tx`] client.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let Some(tx) = self.tx.write().await.take() else {
            // Nothing has been executed, so nothing to commit.
            return Ok(());
        };
        tx.commit().await.map_err(tracerr::wrap!())
    }
}

delegate_connection!(Tx);
