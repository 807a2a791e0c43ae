//! Component C1: the type lattice.

use std::fmt;

/// The closed set of types values in this IR can carry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Int32,
    /// Boolean result of a comparison.
    Int1,
    Void,
    Pointer(Box<Type>),
    /// `dims` is non-empty; a leading `0` marks an unknown-bound first
    /// dimension (the array-parameter decay form).
    Array(Box<Type>, Vec<u32>),
    Function(Box<Type>, Vec<Type>),
}

impl Type {
    pub fn pointer(to: Type) -> Type {
        Type::Pointer(Box::new(to))
    }

    pub fn array(elem: Type, dims: Vec<u32>) -> Type {
        assert!(!dims.is_empty(), "array type must have at least one dimension");
        Type::Array(Box::new(elem), dims)
    }

    /// Size in bytes: `Int32`=4, `Int1`=1 logically, `Pointer`=4,
    /// `Array`=product(dims)·elementSize. `0` for `Void`/`Function`, which
    /// have no storage representation.
    pub fn byte_size(&self) -> u32 {
        match self {
            Type::Int32 => 4,
            Type::Int1 => 1,
            Type::Void => 0,
            Type::Pointer(_) => 4,
            Type::Array(elem, dims) => dims.iter().product::<u32>() * elem.byte_size(),
            Type::Function(..) => 0,
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer(_))
    }

    pub fn is_int32(&self) -> bool {
        matches!(self, Type::Int32)
    }

    pub fn is_int1(&self) -> bool {
        matches!(self, Type::Int1)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    /// The element type of a pointer or array type.
    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Pointer(elem) => Some(elem),
            Type::Array(elem, _) => Some(elem),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int32 => write!(f, "i32"),
            Type::Int1 => write!(f, "i1"),
            Type::Void => write!(f, "void"),
            Type::Pointer(elem) => write!(f, "{elem}*"),
            Type::Array(elem, dims) => {
                write!(f, "{elem}")?;
                for d in dims {
                    write!(f, "[{d}]")?;
                }
                Ok(())
            }
            Type::Function(ret, params) => {
                write!(f, "{ret} (")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scalar_sizes() {
        assert_eq!(Type::Int32.byte_size(), 4);
        assert_eq!(Type::Int1.byte_size(), 1);
        assert_eq!(Type::pointer(Type::Int32).byte_size(), 4);
    }

    #[test]
    fn array_size_is_product_of_dims_times_element_size() {
        let t = Type::array(Type::Int32, vec![3, 4]);
        assert_eq!(t.byte_size(), 3 * 4 * 4);
    }

    #[test]
    fn display_matches_ir_textual_form() {
        assert_eq!(Type::Int32.to_string(), "i32");
        assert_eq!(Type::pointer(Type::Int32).to_string(), "i32*");
        assert_eq!(Type::array(Type::Int32, vec![10, 2]).to_string(), "i32[10][2]");
    }
}
