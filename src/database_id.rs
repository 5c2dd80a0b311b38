//! Database ID type definition.

/// Alias for the integer type used for mapping to database IDs.
///
/// Entity modules define their own aliases of this type (e.g.
/// [crate::tag::TagId]) to make signatures self-describing.
pub type DatabaseId = i64;
