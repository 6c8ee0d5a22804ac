use smallvec::{smallvec, SmallVec};
use spirv_headers as spv;

use crate::*;

pub(crate) const MAX_COMPOSITE_ELEMENTS: u32 = 4;

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct ConstantElement {
    /// Raw bits; 64-bit scalars use the full width.
    pub value: u64,
    /// Set when the element is a specialization constant (or a
    /// specialization expression standing in as zero).
    pub spec_id: Option<Id>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConstantVector {
    pub elements: SmallVec<[ConstantElement; 4]>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConstantColumn {
    pub vector: ConstantVector,
    pub spec_id: Option<Id>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConstantValue {
    Scalar(u64),
    Vector(ConstantVector),
    Matrix(SmallVec<[ConstantColumn; 4]>),
    /// Struct or array built from other constant ids, in member order.
    Composite(Vec<Id>),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Constant {
    pub ty: Id,
    pub value: ConstantValue,
    pub specialization: bool,
    /// Produced by `OpConstantNull` (or synthesized for one).
    pub null: bool,
}

/// `OpSpecConstantOp`, stored unevaluated.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SpecConstantOp {
    pub ty: Id,
    pub opcode: spv::Op,
    pub arguments: Vec<u32>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Undef {
    pub ty: Id,
}

impl ConstantVector {
    pub fn zero(len: u32) -> Self {
        ConstantVector {
            elements: (0..len).map(|_| Default::default()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl ConstantValue {
    /// The zero value of a scalar, vector, matrix or pointer type.
    pub fn zero(ty: &Type) -> Result<Self> {
        if ty.pointer || ty.is_scalar() {
            return Ok(ConstantValue::Scalar(0));
        }
        let arity = ty.vecsize.max(ty.columns);
        if arity > MAX_COMPOSITE_ELEMENTS {
            return Err(ErrorKind::UnsupportedCompositeArity(arity).into());
        }
        Ok(if ty.columns > 1 {
            let column = ConstantColumn {
                vector: ConstantVector::zero(ty.vecsize),
                spec_id: None,
            };
            ConstantValue::Matrix(smallvec![column; ty.columns as usize])
        } else {
            ConstantValue::Vector(ConstantVector::zero(ty.vecsize))
        })
    }
}

impl Constant {
    pub fn scalar(ty: Id, value: u64, specialization: bool) -> Self {
        Constant {
            ty,
            value: ConstantValue::Scalar(value),
            specialization,
            null: false,
        }
    }

    /// The scalar value, if this is a scalar constant.
    pub fn as_scalar(&self) -> Option<u64> {
        match self.value {
            ConstantValue::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn composite(&self) -> Option<&[Id]> {
        match self.value {
            ConstantValue::Composite(ref ids) => Some(ids),
            _ => None,
        }
    }
}
