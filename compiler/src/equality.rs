// equality.rs: Equality strategy selection
//
// Chooses how a changed-check compares the old and new value of one field,
// from the field's canonical type kind and its nullability. The selected
// strategy maps onto a small fixed family of comparison helpers; the plan
// builder de-duplicates helpers across the whole plan.
//
// Preconditions: `ty` was interned in `types`.
// Postconditions: `select` is total and pure.
// Failure modes: none.
// Side effects: none.

use crate::id::TypeId;
use crate::types::{TypeDescriptor, TypeKind, TypeTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatWidth {
    Single,
    Double,
}

/// How one field's old and new values are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EqualityStrategy {
    /// `a != b` on non-floating primitives.
    DirectInequality,
    /// Boxed-equality semantics: NaN equals NaN, `+0.0` differs from `-0.0`.
    CanonicalFloat(FloatWidth),
    /// Elementwise structural equality of a non-null array.
    Elementwise { element: TypeId },
    /// Both null ⇒ equal, one null ⇒ changed, else structural equals.
    /// Nullable arrays keep elementwise comparison behind the null checks.
    NullSafe { array_element: Option<TypeId> },
}

/// A comparison routine the emitted code must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EqualityHelper {
    NullSafeEquals,
    FloatEquals,
    DoubleEquals,
    /// Null-safe elementwise comparison, one per element type.
    ArrayEquals(TypeId),
}

/// Select the comparison for a field of type `ty`.
pub fn select(types: &TypeTable, ty: TypeId, nullable: bool) -> EqualityStrategy {
    let array_element = match types.get(ty) {
        TypeDescriptor::Array(elem) => Some(*elem),
        _ => None,
    };
    if nullable {
        // Nullable primitives are boxed and take the object path.
        return EqualityStrategy::NullSafe { array_element };
    }
    match types.kind(ty) {
        TypeKind::IntegerPrimitive | TypeKind::BooleanPrimitive | TypeKind::OtherPrimitive => {
            EqualityStrategy::DirectInequality
        }
        TypeKind::FloatPrimitive => EqualityStrategy::CanonicalFloat(FloatWidth::Single),
        TypeKind::DoublePrimitive => EqualityStrategy::CanonicalFloat(FloatWidth::Double),
        TypeKind::Array => match array_element {
            Some(element) => EqualityStrategy::Elementwise { element },
            None => EqualityStrategy::NullSafe {
                array_element: None,
            },
        },
        TypeKind::Declared => EqualityStrategy::NullSafe {
            array_element: None,
        },
    }
}

impl EqualityStrategy {
    /// The helper routine this strategy references, if any.
    pub fn helper(self) -> Option<EqualityHelper> {
        match self {
            EqualityStrategy::DirectInequality => None,
            EqualityStrategy::CanonicalFloat(FloatWidth::Single) => Some(EqualityHelper::FloatEquals),
            EqualityStrategy::CanonicalFloat(FloatWidth::Double) => Some(EqualityHelper::DoubleEquals),
            EqualityStrategy::Elementwise { element }
            | EqualityStrategy::NullSafe {
                array_element: Some(element),
            } => Some(EqualityHelper::ArrayEquals(element)),
            EqualityStrategy::NullSafe {
                array_element: None,
            } => Some(EqualityHelper::NullSafeEquals),
        }
    }

    pub fn is_null_safe(self) -> bool {
        matches!(self, EqualityStrategy::NullSafe { .. })
    }
}

impl EqualityHelper {
    /// Listing name; array helpers carry their element type.
    pub fn name(self, types: &TypeTable) -> String {
        match self {
            EqualityHelper::NullSafeEquals => "nullSafeEquals".to_string(),
            EqualityHelper::FloatEquals => "floatEquals".to_string(),
            EqualityHelper::DoubleEquals => "doubleEquals".to_string(),
            EqualityHelper::ArrayEquals(elem) => format!("arrayEquals<{}>", types.display(elem)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Primitive, TypeExpr};

    fn prim(types: &mut TypeTable, p: Primitive) -> TypeId {
        types.intern(&TypeExpr::Primitive(p))
    }

    #[test]
    fn integral_and_boolean_use_direct_inequality() {
        let mut types = TypeTable::new();
        for p in [
            Primitive::Byte,
            Primitive::Short,
            Primitive::Int,
            Primitive::Long,
            Primitive::Char,
            Primitive::Boolean,
        ] {
            let id = prim(&mut types, p);
            assert_eq!(select(&types, id, false), EqualityStrategy::DirectInequality);
            assert_eq!(select(&types, id, false).helper(), None);
        }
    }

    #[test]
    fn floats_never_use_raw_inequality() {
        let mut types = TypeTable::new();
        let f = prim(&mut types, Primitive::Float);
        let d = prim(&mut types, Primitive::Double);
        assert_eq!(
            select(&types, f, false),
            EqualityStrategy::CanonicalFloat(FloatWidth::Single)
        );
        assert_eq!(
            select(&types, d, false).helper(),
            Some(EqualityHelper::DoubleEquals)
        );
    }

    #[test]
    fn nullable_primitive_is_boxed() {
        let mut types = TypeTable::new();
        let i = prim(&mut types, Primitive::Int);
        let s = select(&types, i, true);
        assert!(s.is_null_safe());
        assert_eq!(s.helper(), Some(EqualityHelper::NullSafeEquals));
    }

    #[test]
    fn declared_types_are_null_safe_even_when_non_null() {
        let mut types = TypeTable::new();
        let s = types.intern(&TypeExpr::declared("java.lang.String"));
        assert_eq!(
            select(&types, s, false),
            EqualityStrategy::NullSafe {
                array_element: None
            }
        );
    }

    #[test]
    fn arrays_get_one_helper_per_element_type() {
        let mut types = TypeTable::new();
        let ints = types.intern(&TypeExpr::array_of(TypeExpr::Primitive(Primitive::Int)));
        let strs = types.intern(&TypeExpr::array_of(TypeExpr::declared("java.lang.String")));
        let int = prim(&mut types, Primitive::Int);
        let a = select(&types, ints, false);
        let b = select(&types, strs, false);
        assert_eq!(a, EqualityStrategy::Elementwise { element: int });
        assert_ne!(a.helper(), b.helper());
        assert_eq!(a.helper().map(|h| h.name(&types)).as_deref(), Some("arrayEquals<int>"));
    }

    #[test]
    fn nullable_array_keeps_elementwise_helper() {
        let mut types = TypeTable::new();
        let ints = types.intern(&TypeExpr::array_of(TypeExpr::Primitive(Primitive::Int)));
        let s = select(&types, ints, true);
        assert!(s.is_null_safe());
        assert_eq!(s.helper(), select(&types, ints, false).helper());
    }
}
