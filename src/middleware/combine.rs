//! Combining a base state with a creator of additional fields.

use crate::store::{Getter, Setter, StoreApi};
use crate::value::Value;

/// Build an initializer whose state is `initial` overlaid by the record
/// returned from `create`.
///
/// Keys produced by `create` win on collision. The result is always a
/// fresh record, so it never aliases `initial`.
pub fn combine<F>(initial: Value, create: F) -> impl FnOnce(Setter, Getter, &StoreApi) -> Value
where
    F: FnOnce(Setter, Getter, &StoreApi) -> Value,
{
    move |set: Setter, get: Getter, api: &StoreApi| Value::assign(&initial, &create(set, get, api))
}
