use derivative::Derivative;
use smallvec::SmallVec;
use spirv_headers as spv;

use crate::*;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BaseType {
    Unknown,
    Void,
    Boolean,
    SByte,
    UByte,
    Short,
    UShort,
    Int,
    UInt,
    Int64,
    UInt64,
    AtomicCounter,
    Half,
    Float,
    Double,
    Struct,
    Image,
    SampledImage,
    Sampler,
    /// `OpTypeOpaque`; the declared name is the id's debug name.
    Opaque,
    AccelerationStructure,
}

impl Default for BaseType {
    fn default() -> Self {
        BaseType::Unknown
    }
}

/// One array dimension, innermost first.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ArraySize {
    Literal(u32),
    /// Length given by a specialization constant, resolved downstream.
    Deferred(Id),
    Runtime,
}

#[derive(Clone, Copy, Debug, Derivative, Eq, PartialEq)]
#[derivative(Default)]
pub struct ImageDesc {
    pub sampled_type: Id,
    #[derivative(Default(value = "spv::Dim::Dim1D"))]
    pub dim: spv::Dim,
    pub depth: bool,
    pub arrayed: bool,
    pub multisampled: bool,
    /// 0 = known at runtime only, 1 = sampled, 2 = storage.
    pub sampled: u32,
    #[derivative(Default(value = "spv::ImageFormat::Unknown"))]
    pub format: spv::ImageFormat,
    pub access: Option<spv::AccessQualifier>,
}

#[derive(Clone, Debug, Derivative, PartialEq)]
#[derivative(Default)]
pub struct Type {
    pub basetype: BaseType,
    pub width: u32,
    #[derivative(Default(value = "1"))]
    pub vecsize: u32,
    #[derivative(Default(value = "1"))]
    pub columns: u32,
    pub array: SmallVec<[ArraySize; 2]>,
    pub pointer: bool,
    /// Placeholder registered by `OpTypeForwardPointer`.
    pub forward_pointer: bool,
    pub pointer_depth: u32,
    #[derivative(Default(value = "spv::StorageClass::Generic"))]
    pub storage: spv::StorageClass,
    pub member_types: Vec<Id>,
    pub image: ImageDesc,
    /// Arrays and pointers keep the id of the type they were derived from,
    /// so metadata lookups through `self_id` see the underlying type.
    pub self_id: Id,
    pub parent_type: Option<Id>,
    pub type_alias: Option<Id>,
}

impl Type {
    pub fn new(id: Id, basetype: BaseType, width: u32) -> Self {
        Type { basetype, width, self_id: id, ..Default::default() }
    }

    pub fn structure(id: Id, member_types: Vec<Id>) -> Self {
        Type { member_types, ..Type::new(id, BaseType::Struct, 0) }
    }

    pub fn image(id: Id, image: ImageDesc) -> Self {
        Type { image, ..Type::new(id, BaseType::Image, 0) }
    }

    pub fn sampled_image(id: Id, image: &Type) -> Self {
        Type {
            basetype: BaseType::SampledImage,
            self_id: id,
            ..image.clone()
        }
    }

    pub fn vector_of(id: Id, base_id: Id, base: &Type, count: u32) -> Self {
        Type {
            vecsize: count,
            self_id: id,
            parent_type: Some(base_id),
            ..base.clone()
        }
    }

    pub fn matrix_of(id: Id, base_id: Id, base: &Type, columns: u32) -> Self {
        Type {
            columns,
            self_id: id,
            parent_type: Some(base_id),
            ..base.clone()
        }
    }

    /// Appends a dimension to the element type. `self_id` is inherited.
    pub fn array_of(base_id: Id, base: &Type, size: ArraySize) -> Self {
        let mut ty = base.clone();
        ty.array.push(size);
        ty.parent_type = Some(base_id);
        ty
    }

    /// Pointer to `base`. `self_id` is inherited.
    pub fn pointer_to(base_id: Id, base: &Type, storage: spv::StorageClass) ->
        Self
    {
        let mut ty = base.clone();
        ty.pointer = true;
        ty.forward_pointer = false;
        ty.pointer_depth += 1;
        ty.storage = storage;
        ty.parent_type = Some(base_id);
        if storage == spv::StorageClass::AtomicCounter {
            ty.basetype = BaseType::AtomicCounter;
        }
        ty
    }

    pub fn forward_pointer(id: Id, storage: spv::StorageClass) -> Self {
        let mut ty = Type::new(id, BaseType::Unknown, 0);
        ty.pointer = true;
        ty.forward_pointer = true;
        ty.pointer_depth = 1;
        ty.storage = storage;
        if storage == spv::StorageClass::AtomicCounter {
            ty.basetype = BaseType::AtomicCounter;
        }
        ty
    }

    pub fn is_struct(&self) -> bool {
        self.basetype == BaseType::Struct && !self.pointer
            && self.array.is_empty()
    }

    pub fn is_scalar(&self) -> bool {
        self.vecsize == 1 && self.columns == 1 && self.array.is_empty()
            && self.member_types.is_empty()
    }
}

/// Structural equivalence used for struct aliasing. Compares shape and
/// recurses into member types; names and decorations are not considered.
pub fn logically_equivalent(ids: &IdTable, a: &Type, b: &Type) -> Result<bool> {
    if a.basetype != b.basetype
        || a.width != b.width
        || a.vecsize != b.vecsize
        || a.columns != b.columns
        || a.array != b.array
    {
        return Ok(false);
    }

    // Pointers may be cyclic, so compare them shallowly.
    if a.pointer != b.pointer {
        return Ok(false);
    }
    if a.pointer {
        return Ok(a.pointer_depth == b.pointer_depth && a.storage == b.storage
            && a.self_id == b.self_id);
    }

    let is_image = |ty: &Type| {
        [BaseType::Image, BaseType::SampledImage].contains(&ty.basetype)
    };
    if is_image(a) && a.image != b.image {
        return Ok(false);
    }

    if a.member_types.len() != b.member_types.len() {
        return Ok(false);
    }
    for (&ma, &mb) in a.member_types.iter().zip(b.member_types.iter()) {
        let ma = ids.get::<Type>(ma)?;
        let mb = ids.get::<Type>(mb)?;
        if !logically_equivalent(ids, ma, mb)? {
            return Ok(false);
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_self_ids() {
        let float = Type::new(1, BaseType::Float, 32);
        let vec4 = Type::vector_of(2, 1, &float, 4);
        assert_eq!((vec4.self_id, vec4.vecsize, vec4.parent_type), (2, 4, Some(1)));

        let mat4 = Type::matrix_of(3, 2, &vec4, 4);
        assert_eq!((mat4.self_id, mat4.vecsize, mat4.columns), (3, 4, 4));

        let arr = Type::array_of(3, &mat4, ArraySize::Literal(8));
        assert_eq!(arr.self_id, 3);
        assert_eq!(&arr.array[..], &[ArraySize::Literal(8)]);

        let ptr = Type::pointer_to(3, &arr, spv::StorageClass::Uniform);
        assert_eq!(ptr.self_id, 3);
        assert_eq!(ptr.pointer_depth, 1);
        assert_eq!(ptr.parent_type, Some(3));
    }

    #[test]
    fn atomic_counter_pointer() {
        let uint = Type::new(1, BaseType::UInt, 32);
        let ptr = Type::pointer_to(1, &uint, spv::StorageClass::AtomicCounter);
        assert_eq!(ptr.basetype, BaseType::AtomicCounter);
        let fwd = Type::forward_pointer(2, spv::StorageClass::AtomicCounter);
        assert_eq!(fwd.basetype, BaseType::AtomicCounter);
        assert!(fwd.forward_pointer);
    }

    #[test]
    fn equivalence() {
        let mut ids = IdTable::with_bound(8);
        ids.declare(1, Type::new(1, BaseType::Float, 32)).unwrap();
        ids.declare(2, Type::new(2, BaseType::Int, 32)).unwrap();
        ids.declare(3, Type::new(3, BaseType::Float, 32)).unwrap();

        let a = Type::structure(4, vec![1, 2]);
        let b = Type::structure(5, vec![3, 2]);
        let c = Type::structure(6, vec![2, 2]);
        assert!(logically_equivalent(&ids, &a, &b).unwrap());
        assert!(!logically_equivalent(&ids, &a, &c).unwrap());

        let d = Type::structure(7, vec![1]);
        assert!(!logically_equivalent(&ids, &a, &d).unwrap());

        let p = Type::pointer_to(4, &a, spv::StorageClass::Uniform);
        let q = Type::pointer_to(5, &b, spv::StorageClass::Uniform);
        assert!(logically_equivalent(&ids, &p, &p.clone()).unwrap());
        assert!(!logically_equivalent(&ids, &p, &q).unwrap());
    }
}
