//! Result batches and their lifetimes.
//!
//! A [`StreamBatch`] is only valid while the stream that produced it is
//! open; it borrows the stream. Keeping data past that point requires
//! [`StreamBatch::retain`], which hands out an owned [`Batch`].

use std::ops::Deref;
use std::sync::{Arc, Weak};

use arrow_array::{Array, RecordBatch};
use arrow_schema::DataType;

use crate::error::{Error, Result};
use crate::value::{decode_row, Value};

/// A record batch owned by the caller. Cheap to clone; the underlying
/// buffers are released when the last clone is dropped.
#[derive(Debug, Clone)]
pub struct Batch {
    inner: Arc<RecordBatch>,
}

impl Batch {
    pub(crate) fn from_shared(inner: Arc<RecordBatch>) -> Self {
        Self { inner }
    }

    /// Number of live handles to the buffers, including this one.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    pub fn watch(&self) -> BatchWatch {
        BatchWatch {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn into_record_batch(self) -> RecordBatch {
        Arc::unwrap_or_clone(self.inner)
    }

    /// Decodes every row of the batch.
    pub fn rows(&self) -> Result<Vec<Vec<Value>>> {
        (0..self.inner.num_rows())
            .map(|row| decode_row(&self.inner, row))
            .collect()
    }
}

impl Deref for Batch {
    type Target = RecordBatch;

    fn deref(&self) -> &RecordBatch {
        &self.inner
    }
}

impl From<RecordBatch> for Batch {
    fn from(batch: RecordBatch) -> Self {
        Self {
            inner: Arc::new(batch),
        }
    }
}

/// A batch borrowed from an open result stream.
#[derive(Debug)]
pub struct StreamBatch<'a> {
    inner: &'a Arc<RecordBatch>,
}

impl<'a> StreamBatch<'a> {
    pub(crate) fn new(inner: &'a Arc<RecordBatch>) -> Self {
        Self { inner }
    }

    /// Takes an owned handle that outlives the stream.
    pub fn retain(&self) -> Batch {
        Batch::from_shared(Arc::clone(self.inner))
    }
}

impl Deref for StreamBatch<'_> {
    type Target = RecordBatch;

    fn deref(&self) -> &RecordBatch {
        self.inner
    }
}

/// Observes whether a batch's buffers have been released.
#[derive(Debug, Clone)]
pub struct BatchWatch {
    inner: Weak<RecordBatch>,
}

impl BatchWatch {
    pub(crate) fn new(inner: Weak<RecordBatch>) -> Self {
        Self { inner }
    }

    pub fn is_released(&self) -> bool {
        self.inner.strong_count() == 0
    }
}

pub fn total_rows(batches: &[Batch]) -> usize {
    batches.iter().map(|batch| batch.num_rows()).sum()
}

/// Reads the affected-row count Datalayers returns for DDL and DML sent
/// through a query: a single row whose first column is an integer.
pub fn affected_rows(batches: &[Batch]) -> Result<i64> {
    let Some(batch) = batches.iter().find(|batch| batch.num_rows() > 0) else {
        return Err(Error::InvalidResponse(
            "no affected-rows batch in the result".to_string(),
        ));
    };
    if batch.num_columns() == 0 {
        return Err(Error::InvalidResponse(
            "affected-rows batch has no columns".to_string(),
        ));
    }
    let column = batch.column(0);
    if !matches!(
        column.data_type(),
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    ) {
        return Err(Error::InvalidResponse(format!(
            "affected-rows column has type {}",
            column.data_type()
        )));
    }
    Value::decode(column.as_ref(), 0)?
        .as_i64()
        .ok_or_else(|| Error::InvalidResponse("affected-rows value is null".to_string()))
}
