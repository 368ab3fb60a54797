use crate::schema::TypeSchema;
use crate::value::Value;

// -----------------------------------------------------------------------------
// FilterSet

/// Adjustments to what the engine sees for a type, without writing a full
/// container.
///
/// All methods have permissive defaults; implement only what you need.
pub trait FilterSet {
    /// Member names to force-include for the given type, on top of the
    /// default participation rule (everything not marked skipped).
    ///
    /// Names that match no member are ignored.
    fn additional_members(&self, schema: &'static TypeSchema) -> Option<Vec<&'static str>> {
        let _ = schema;
        None
    }

    /// Whether the given type may participate at all.
    ///
    /// Returning `false` makes the type non-serializable unless a container
    /// claims it.
    fn is_type_serializable(&self, schema: &'static TypeSchema) -> bool {
        let _ = schema;
        true
    }

    /// Hook invoked on every instance the decoder allocates through a
    /// default or placeholder allocator, before members are populated.
    ///
    /// Use it to clean up side effects of allocation (e.g. release a
    /// resource the allocator acquired). Returning `true` claims the hook:
    /// later filters are not consulted for this instance.
    fn post_allocate(&self, value: &mut dyn Value) -> bool {
        let _ = value;
        false
    }
}
