//! A blocking client.
//!
//! Each method runs the matching [`crate::Client`] call to completion on a
//! current-thread runtime owned by the client. Do not call it from inside
//! another tokio runtime.

use std::sync::Arc;

use tokio::runtime::Runtime;

use crate::batch::Batch;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::prepared::{ParameterBatch, PreparedStatement};
use crate::session::SessionContext;
use crate::stream::ResultHandle;

#[derive(Debug, Clone)]
pub struct Client {
    inner: crate::Client,
    runtime: Arc<Runtime>,
}

impl Client {
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Connection(format!("failed to start runtime: {e}")))?;
        let inner = runtime.block_on(crate::Client::connect(config))?;
        Ok(Self {
            inner,
            runtime: Arc::new(runtime),
        })
    }

    pub fn context(&self) -> &SessionContext {
        self.inner.context()
    }

    #[must_use]
    pub fn with_database(&self, database: impl Into<String>) -> Self {
        Self {
            inner: self.inner.with_database(database),
            runtime: Arc::clone(&self.runtime),
        }
    }

    pub fn execute(&self, sql: &str) -> Result<ResultHandle> {
        self.runtime.block_on(self.inner.execute(sql))
    }

    pub fn query(&self, sql: &str) -> Result<Vec<Batch>> {
        self.runtime.block_on(self.inner.query(sql))
    }

    pub fn execute_update(&self, sql: &str) -> Result<i64> {
        self.runtime.block_on(self.inner.execute_update(sql))
    }

    pub fn fetch(&self, handle: ResultHandle) -> Result<Vec<Batch>> {
        self.runtime.block_on(self.inner.fetch(handle))
    }

    pub fn prepare(&self, sql: &str) -> Result<PreparedStatement> {
        self.runtime.block_on(self.inner.prepare(sql))
    }

    pub fn execute_prepared(
        &self,
        statement: &mut PreparedStatement,
        params: ParameterBatch,
    ) -> Result<Vec<Batch>> {
        self.runtime
            .block_on(self.inner.execute_prepared(statement, params))
    }

    pub fn execute_prepared_update(
        &self,
        statement: &mut PreparedStatement,
        params: ParameterBatch,
    ) -> Result<i64> {
        self.runtime
            .block_on(self.inner.execute_prepared_update(statement, params))
    }

    pub fn close_prepared(&self, statement: &mut PreparedStatement) -> Result<()> {
        self.runtime.block_on(self.inner.close_prepared(statement))
    }
}
