//! Assembly of output batches from matched row ids.

use crate::error::{IntervalJoinError, Result};
use crate::joins::intervals::Position;
use crate::joins::scan::MatchedPair;
use datafusion::arrow::array::{ArrayRef, PrimitiveArray, UInt64Array, UInt64BufferBuilder};
use datafusion::arrow::compute::take;
use datafusion::arrow::datatypes::{Field, Schema, SchemaRef};
use datafusion::arrow::record_batch::{RecordBatch, RecordBatchOptions};
use fnv::FnvHashSet;
use std::sync::Arc;

/// All left columns followed by all right columns.
///
/// A right column whose name is taken by a left column gets `suffix`
/// appended, repeatedly if the suffixed name is itself taken. An empty
/// suffix cannot disambiguate anything and is rejected.
pub fn build_join_schema(left: &Schema, right: &Schema, suffix: &str) -> Result<SchemaRef> {
    if suffix.is_empty() {
        return Err(IntervalJoinError::InvalidConfig {
            key: "suffix",
            reason: "must not be empty".to_string(),
        });
    }
    let left_names: FnvHashSet<&str> = left.fields().iter().map(|f| f.name().as_str()).collect();
    let mut taken: FnvHashSet<String> = left
        .fields()
        .iter()
        .chain(right.fields().iter())
        .map(|f| f.name().clone())
        .collect();

    let mut fields: Vec<Field> = left.fields().iter().map(|f| f.as_ref().clone()).collect();
    for field in right.fields() {
        if !left_names.contains(field.name().as_str()) {
            fields.push(field.as_ref().clone());
            continue;
        }
        let mut name = format!("{}{}", field.name(), suffix);
        while taken.contains(&name) {
            name.push_str(suffix);
        }
        taken.insert(name.clone());
        fields.push(field.as_ref().clone().with_name(name));
    }
    Ok(Arc::new(Schema::new(fields)))
}

fn indices(positions: impl Iterator<Item = Position>) -> UInt64Array {
    let (lower, _) = positions.size_hint();
    let mut builder = UInt64BufferBuilder::new(lower);
    for pos in positions {
        builder.append(pos as u64);
    }
    PrimitiveArray::new(builder.finish().into(), None)
}

fn take_columns(batch: &RecordBatch, indices: &UInt64Array) -> Result<Vec<ArrayRef>> {
    Ok(batch
        .columns()
        .iter()
        .map(|c| take(c.as_ref(), indices, None))
        .collect::<std::result::Result<Vec<_>, _>>()?)
}

/// One output row per pair: the left row's values followed by the right row's.
pub fn assemble(
    schema: SchemaRef,
    left: &RecordBatch,
    right: &RecordBatch,
    pairs: &[MatchedPair],
) -> Result<RecordBatch> {
    let left_indexes = indices(pairs.iter().map(|p| p.left));
    let right_indexes = indices(pairs.iter().map(|p| p.right));

    let mut columns = take_columns(left, &left_indexes)?;
    columns.extend(take_columns(right, &right_indexes)?);

    let options = RecordBatchOptions::new().with_row_count(Some(pairs.len()));
    Ok(RecordBatch::try_new_with_options(schema, columns, &options)?)
}

/// The rows of `batch` at `rows`, in the given order, under its own schema.
pub fn take_rows(batch: &RecordBatch, rows: &[Position]) -> Result<RecordBatch> {
    let indexes = indices(rows.iter().copied());
    let columns = take_columns(batch, &indexes)?;
    let options = RecordBatchOptions::new().with_row_count(Some(rows.len()));
    Ok(RecordBatch::try_new_with_options(
        batch.schema(),
        columns,
        &options,
    )?)
}
