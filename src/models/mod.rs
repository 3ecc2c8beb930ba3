// src/models/mod.rs

pub mod attempt;
pub mod catalog;
pub mod exam;
pub mod live_class;
pub mod question;
pub mod user;

use async_graphql::MaybeUndefined;

/// Applies a nullable patch field: absent keeps, `null` clears, a value replaces.
pub fn apply_patch<T>(target: &mut Option<T>, patch: MaybeUndefined<T>) {
    match patch {
        MaybeUndefined::Undefined => {}
        MaybeUndefined::Null => *target = None,
        MaybeUndefined::Value(value) => *target = Some(value),
    }
}
