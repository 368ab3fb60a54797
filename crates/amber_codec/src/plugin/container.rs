use core::error;

use crate::schema::TypeSchema;
use crate::value::Value;

// -----------------------------------------------------------------------------
// Container

/// A surrogate provider for types the engine should not walk directly.
///
/// When a container claims a type, instances travel as the surrogate
/// produced by [`pack`]; decoding reverses through [`unpack`]. The surrogate
/// is an ordinary value with its own schema, encoded and decoded like
/// anything else, so a container only needs to translate, never to touch the
/// wire.
///
/// Containers are consulted in registration order and the first applicable
/// one wins; registering two containers that claim the same type is
/// documented behavior, not an error.
///
/// [`pack`]: Container::pack
/// [`unpack`]: Container::unpack
pub trait Container {
    /// Whether this container claims the given type.
    fn applies_to(&self, schema: &'static TypeSchema) -> bool;

    /// Converts an instance into its surrogate.
    fn pack(&self, value: &dyn Value) -> Result<Box<dyn Value>, Box<dyn error::Error>>;

    /// Converts a decoded surrogate back into an instance.
    fn unpack(&self, surrogate: Box<dyn Value>) -> Result<Box<dyn Value>, Box<dyn error::Error>>;

    /// Whether the container intercepts even types that could be constructed
    /// normally (default allocator or matching constructor).
    fn applies_even_with_constructor(&self) -> bool {
        false
    }

    /// Whether the container may claim value kinds
    /// (Primitive/Str/Enum/Nullable). Composite kinds are always fair game.
    fn applies_to_values(&self) -> bool {
        false
    }
}

/// Resolves the first applicable container for a type, honoring the
/// value-kind opt-in rule.
pub fn first_applicable(
    containers: &[Box<dyn Container>],
    schema: &'static TypeSchema,
) -> Option<usize> {
    containers.iter().position(|container| {
        container.applies_to(schema)
            && (schema.kind().is_composite() || container.applies_to_values())
    })
}
