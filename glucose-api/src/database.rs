use deadpool_diesel::postgres::{Manager, Pool};
use deadpool_diesel::Runtime;
use diesel::pg::PgConnection;
use diesel::ConnectionResult;

use diesel::Connection as DieselConnection;
use crate::problem::{AppResult, Problem};

#[derive(Clone)]
pub struct PgPool(deadpool_diesel::postgres::Pool);

pub struct Connection(deadpool_diesel::postgres::Connection);

impl PgPool {
    /// Create a pool of at most 8 connections. Connections are established lazily, the first
    /// time they are needed.
    pub fn new(database_url: &str, connection_timeout: std::time::Duration) -> anyhow::Result<Self> {
        let manager = Manager::new(database_url, Runtime::Tokio1);
        let pool = Pool::builder(manager)
            .runtime(Runtime::Tokio1)
            .max_size(8)
            .create_timeout(Some(connection_timeout))
            .wait_timeout(Some(connection_timeout))
            .build()
            .map_err(|err| anyhow::anyhow!("could not build the database pool: {}", err))?;
        Ok(Self(pool))
    }

    pub async fn get(self) -> AppResult<Connection> {
        self.0.get().await.map_err(Problem::from).map(Connection)
    }
}

impl Connection {
    /// Interact with the underlying connection on a separate thread.
    ///
    /// This helper method converts pool errors into `Problem`, taking a callback returning a
    /// `Result<_, E>` where `E` converts into `Problem` (e.g., diesel errors), and flattening both
    /// errors into a single `AppResult<R>`.
    pub async fn interact_flatten_err<F, R, E>(&self, f: F) -> AppResult<R>
    where
        F: FnOnce(&mut diesel::pg::PgConnection) -> Result<R, E> + Send + 'static,
        R: Send + 'static,
        E: Send + 'static,
        Problem: From<E>,
    {
        Ok(self.0.interact(f).await??)
    }
}

/// A single connection outside of the pool, for administrative tasks.
pub fn oneoff_connection(database_url: &str) -> ConnectionResult<PgConnection> {
    PgConnection::establish(database_url)
}
