use log::trace;

use crate::*;
use super::{Operands, Parser};

fn int_type(width: u32, signed: bool) -> Result<BaseType> {
    Ok(match (width, signed) {
        (8, true) => BaseType::SByte,
        (8, false) => BaseType::UByte,
        (16, true) => BaseType::Short,
        (16, false) => BaseType::UShort,
        (32, true) => BaseType::Int,
        (32, false) => BaseType::UInt,
        (64, true) => BaseType::Int64,
        (64, false) => BaseType::UInt64,
        _ => return Err(ErrorKind::UnsupportedWidth(width).into()),
    })
}

fn float_type(width: u32) -> Result<BaseType> {
    Ok(match width {
        16 => BaseType::Half,
        32 => BaseType::Float,
        64 => BaseType::Double,
        _ => return Err(ErrorKind::UnsupportedWidth(width).into()),
    })
}

impl<'data> Parser<'data> {
    pub(super) fn parse_type_int(&mut self, ops: &mut Operands) -> Result<()> {
        let id = ops.consume()?;
        let width = ops.consume()?;
        let signed = ops.consume()? != 0;
        self.declare(id, Type::new(id, int_type(width, signed)?, width))?;
        Ok(())
    }

    pub(super) fn parse_type_float(&mut self, ops: &mut Operands) -> Result<()> {
        let id = ops.consume()?;
        let width = ops.consume()?;
        self.declare(id, Type::new(id, float_type(width)?, width))?;
        Ok(())
    }

    pub(super) fn parse_type_vector(&mut self, ops: &mut Operands) -> Result<()> {
        let id = ops.consume()?;
        let component = ops.consume()?;
        let count = ops.consume()?;
        let ty = Type::vector_of(id, component, self.ids().get(component)?, count);
        self.declare(id, ty)?;
        Ok(())
    }

    pub(super) fn parse_type_matrix(&mut self, ops: &mut Operands) -> Result<()> {
        let id = ops.consume()?;
        let column = ops.consume()?;
        let columns = ops.consume()?;
        let ty = Type::matrix_of(id, column, self.ids().get(column)?, columns);
        self.declare(id, ty)?;
        Ok(())
    }

    // A length taken from a plain constant is known now; anything
    // specializable is left for a later pass to resolve.
    fn array_size(&self, length: Id) -> Result<ArraySize> {
        match self.ids().entry(length) {
            Some(IdEntry::Constant(constant)) if !constant.specialization => {
                let value = constant.as_scalar()
                    .ok_or(ErrorKind::TypeMismatch(length))?;
                if value > u32::MAX as u64 {
                    return Err(ErrorKind::LimitExceeded.into());
                }
                Ok(ArraySize::Literal(value as u32))
            },
            Some(IdEntry::Constant(_)) | Some(IdEntry::ConstantOp(_)) =>
                Ok(ArraySize::Deferred(length)),
            Some(_) => Err(ErrorKind::TypeMismatch(length).into()),
            None => Err(ErrorKind::UnknownId(length).into()),
        }
    }

    pub(super) fn parse_type_array(&mut self, ops: &mut Operands) -> Result<()> {
        let id = ops.consume()?;
        let element = ops.consume()?;
        let length = ops.consume()?;
        let size = self.array_size(length)?;
        let ty = Type::array_of(element, self.ids().get(element)?, size);
        self.declare(id, ty)?;
        Ok(())
    }

    pub(super) fn parse_type_runtime_array(&mut self, ops: &mut Operands) ->
        Result<()>
    {
        let id = ops.consume()?;
        let element = ops.consume()?;
        let ty = Type::array_of(
            element, self.ids().get(element)?, ArraySize::Runtime);
        self.declare(id, ty)?;
        Ok(())
    }

    pub(super) fn parse_type_struct(&mut self, ops: &mut Operands) -> Result<()> {
        let id = ops.consume()?;
        let members = ops.rest().to_vec();
        for &member in members.iter() {
            self.ids().get::<Type>(member)?;
        }
        let mut ty = Type::structure(id, members);

        // Unnamed structs are never aliased.
        let name = self.module.meta.name(id);
        if !name.is_empty() {
            let ids = &self.module.ids;
            let candidates = self.struct_cache.entry(name.to_owned())
                .or_default();
            for &other in candidates.iter() {
                if logically_equivalent(ids, ids.get(other)?, &ty)? {
                    trace!("struct %{} aliases %{}", id, other);
                    ty.type_alias = Some(other);
                    break;
                }
            }
            if ty.type_alias.is_none() {
                candidates.push(id);
            }
        }

        self.declare(id, ty)?;
        Ok(())
    }

    pub(super) fn parse_type_pointer(&mut self, ops: &mut Operands) -> Result<()> {
        let id = ops.consume()?;
        let storage = ops.parse_enum()?;
        let pointee = ops.consume()?;
        let base = self.ids().get::<Type>(pointee)?;
        let forward = base.forward_pointer;
        let ty = Type::pointer_to(pointee, base, storage);
        if forward {
            self.forward_pointer_fixups.push((id, pointee));
        }
        self.declare(id, ty)?;
        Ok(())
    }

    pub(super) fn parse_type_forward_pointer(&mut self, ops: &mut Operands) ->
        Result<()>
    {
        let id = ops.consume()?;
        let storage = ops.parse_enum()?;
        self.declare(id, Type::forward_pointer(id, storage))?;
        Ok(())
    }

    pub(super) fn parse_type_image(&mut self, ops: &mut Operands) -> Result<()> {
        let id = ops.consume()?;
        let sampled_type = ops.consume()?;
        self.ids().get::<Type>(sampled_type)?;
        let desc = ImageDesc {
            sampled_type,
            dim: ops.parse_enum()?,
            // 2 means "unknown", which is treated as not depth.
            depth: ops.consume()? == 1,
            arrayed: ops.consume()? != 0,
            multisampled: ops.consume()? != 0,
            sampled: ops.consume()?,
            format: ops.parse_enum()?,
            access: if ops.is_empty() { None } else { Some(ops.parse_enum()?) },
        };
        self.declare(id, Type::image(id, desc))?;
        Ok(())
    }

    pub(super) fn parse_type_sampled_image(&mut self, ops: &mut Operands) ->
        Result<()>
    {
        let id = ops.consume()?;
        let image = ops.consume()?;
        let ty = Type::sampled_image(id, self.ids().get(image)?);
        self.declare(id, ty)?;
        Ok(())
    }

    pub(super) fn parse_type_opaque(&mut self, ops: &mut Operands) ->
        Result<()>
    {
        let id = ops.consume()?;
        let name = ops.parse_string()?;
        let meta = self.meta_mut(id)?;
        if meta.name.is_empty() {
            meta.name = name;
        }
        self.declare(id, Type::new(id, BaseType::Opaque, 0))?;
        Ok(())
    }

    pub(super) fn parse_type_function(&mut self, ops: &mut Operands) ->
        Result<()>
    {
        let id = ops.consume()?;
        let return_type = ops.consume()?;
        let parameter_types = ops.rest().to_vec();
        self.declare(id, FunctionPrototype { return_type, parameter_types })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use spirv_headers as spv;

    use crate::*;
    use crate::testing::*;

    fn scalars(asm: &mut Assembler) {
        asm.op(spv::Op::TypeVoid, &[1]);
        asm.op(spv::Op::TypeFloat, &[2, 32]);
        asm.op(spv::Op::TypeInt, &[3, 32, 0]);
        asm.op(spv::Op::TypeInt, &[4, 64, 1]);
        asm.op(spv::Op::TypeBool, &[5]);
    }

    #[test]
    fn scalar_types() {
        let mut asm = Assembler::new();
        scalars(&mut asm);
        asm.op(spv::Op::TypeFloat, &[6, 16]);
        let module = asm.parse().unwrap();
        let ty = |id| module.get::<Type>(id).unwrap();
        assert_eq!(ty(1).basetype, BaseType::Void);
        assert_eq!((ty(2).basetype, ty(2).width), (BaseType::Float, 32));
        assert_eq!(ty(3).basetype, BaseType::UInt);
        assert_eq!((ty(4).basetype, ty(4).width), (BaseType::Int64, 64));
        assert_eq!((ty(5).basetype, ty(5).width), (BaseType::Boolean, 1));
        assert_eq!(ty(6).basetype, BaseType::Half);
        assert_eq!(module.ids().ids_of(IdKind::Type), &[1, 2, 3, 4, 5, 6]);

        let mut asm = Assembler::new();
        asm.op(spv::Op::TypeInt, &[1, 24, 0]);
        assert_eq!(asm.parse().unwrap_err().kind(), ErrorKind::UnsupportedWidth(24));
    }

    #[test]
    fn composite_types() {
        let mut asm = Assembler::new();
        scalars(&mut asm);
        asm.op(spv::Op::TypeVector, &[10, 2, 4]);
        asm.op(spv::Op::TypeMatrix, &[11, 10, 4]);
        asm.op(spv::Op::Constant, &[3, 12, 8]);
        asm.op(spv::Op::TypeArray, &[13, 11, 12]);
        asm.op(spv::Op::TypeRuntimeArray, &[14, 10]);
        asm.op(spv::Op::TypePointer,
            &[15, spv::StorageClass::Uniform as u32, 13]);
        let module = asm.parse().unwrap();
        let ty = |id| module.get::<Type>(id).unwrap();

        let vec4 = ty(10);
        assert_eq!((vec4.self_id, vec4.vecsize, vec4.parent_type), (10, 4, Some(2)));
        let mat4 = ty(11);
        assert_eq!((mat4.self_id, mat4.vecsize, mat4.columns), (11, 4, 4));

        let array = ty(13);
        assert_eq!(array.self_id, 11);
        assert_eq!(&array.array[..], &[ArraySize::Literal(8)]);
        assert_eq!(array.parent_type, Some(11));

        assert_eq!(&ty(14).array[..], &[ArraySize::Runtime]);
        assert_eq!(ty(14).self_id, 10);

        let pointer = ty(15);
        assert!(pointer.pointer);
        assert_eq!(pointer.self_id, 11);
        assert_eq!(pointer.storage, spv::StorageClass::Uniform);
        assert_eq!(&pointer.array[..], &[ArraySize::Literal(8)]);
    }

    #[test]
    fn opaque_types() {
        let mut asm = Assembler::new();
        asm.op_string(spv::Op::TypeOpaque, &[1], "Handle");
        asm.op(spv::Op::TypeAccelerationStructureNV, &[2]);
        asm.op(spv::Op::TypePointer,
            &[3, spv::StorageClass::UniformConstant as u32, 2]);
        let module = asm.parse().unwrap();

        assert_eq!(module.get::<Type>(1).unwrap().basetype, BaseType::Opaque);
        assert_eq!(module.name(1), "Handle");
        assert_eq!(module.get::<Type>(2).unwrap().basetype,
            BaseType::AccelerationStructure);
        let pointer = module.get::<Type>(3).unwrap();
        assert!(pointer.pointer);
        assert_eq!(pointer.self_id, 2);
    }

    #[test]
    fn wide_array_lengths() {
        let mut asm = Assembler::new();
        scalars(&mut asm);
        asm.op(spv::Op::Constant, &[4, 10, 3, 1]);
        asm.op(spv::Op::TypeArray, &[11, 2, 10]);
        assert_eq!(asm.parse().unwrap_err().kind(), ErrorKind::LimitExceeded);

        let mut asm = Assembler::new();
        scalars(&mut asm);
        asm.op(spv::Op::Constant, &[4, 10, 0xffff_ffff, 0]);
        asm.op(spv::Op::TypeArray, &[11, 2, 10]);
        let module = asm.parse().unwrap();
        assert_eq!(&module.get::<Type>(11).unwrap().array[..],
            &[ArraySize::Literal(0xffff_ffff)]);
    }

    #[test]
    fn spec_constant_array_length() {
        let mut asm = Assembler::new();
        scalars(&mut asm);
        asm.op(spv::Op::SpecConstant, &[3, 10, 4]);
        asm.op(spv::Op::TypeArray, &[11, 2, 10]);
        asm.op(spv::Op::SpecConstantOp, &[3, 12, spv::Op::IAdd as u32, 10, 10]);
        asm.op(spv::Op::TypeArray, &[13, 11, 12]);
        let module = asm.parse().unwrap();
        assert_eq!(&module.get::<Type>(11).unwrap().array[..],
            &[ArraySize::Deferred(10)]);
        assert_eq!(&module.get::<Type>(13).unwrap().array[..],
            &[ArraySize::Deferred(10), ArraySize::Deferred(12)]);

        let mut asm = Assembler::new();
        scalars(&mut asm);
        asm.op(spv::Op::TypeArray, &[11, 2, 1]);
        assert_eq!(asm.parse().unwrap_err().kind(), ErrorKind::TypeMismatch(1));
    }

    #[test]
    fn struct_aliasing() {
        init_logging();
        let mut asm = Assembler::new();
        scalars(&mut asm);
        asm.op_string(spv::Op::Name, &[10], "Light");
        asm.op_string(spv::Op::Name, &[11], "Light");
        asm.op_string(spv::Op::Name, &[12], "Light");
        asm.op(spv::Op::TypeVector, &[6, 2, 3]);
        asm.op(spv::Op::TypeVector, &[7, 2, 3]);
        asm.op(spv::Op::TypeStruct, &[10, 6, 2]);
        asm.op(spv::Op::TypeStruct, &[11, 7, 2]);
        // Differs in the second member.
        asm.op(spv::Op::TypeStruct, &[12, 7, 3]);
        // Unnamed structs never alias.
        asm.op(spv::Op::TypeStruct, &[13, 6, 2]);
        asm.op(spv::Op::TypeStruct, &[14, 6, 2]);
        let module = asm.parse().unwrap();
        let alias = |id| module.get::<Type>(id).unwrap().type_alias;
        assert_eq!(alias(10), None);
        assert_eq!(alias(11), Some(10));
        assert_eq!(alias(12), None);
        assert_eq!(alias(13), None);
        assert_eq!(alias(14), None);
    }

    #[test]
    fn forward_pointers() {
        init_logging();
        let storage = spv::StorageClass::StorageBuffer as u32;
        let mut asm = Assembler::new();
        scalars(&mut asm);
        asm.op(spv::Op::TypeForwardPointer, &[10, storage]);
        asm.op(spv::Op::TypeStruct, &[11, 2, 10]);
        asm.op(spv::Op::TypePointer, &[10, storage, 11]);
        asm.op(spv::Op::TypePointer, &[12, storage, 10]);
        let module = asm.parse().unwrap();

        let pointer = module.get::<Type>(10).unwrap();
        assert!(pointer.pointer && !pointer.forward_pointer);
        assert_eq!(pointer.basetype, BaseType::Struct);
        assert_eq!(pointer.self_id, 11);
        assert_eq!(module.ids().ids_of(IdKind::Type).iter()
            .filter(|&&id| id == 10).count(), 1);

        let outer = module.get::<Type>(12).unwrap();
        assert_eq!(outer.pointer_depth, 2);
        assert_eq!(&outer.member_types[..], &[2, 10]);

        let placeholder = Type::forward_pointer(10,
            spv::StorageClass::StorageBuffer);
        assert_eq!(placeholder.basetype, BaseType::Unknown);
    }

    #[test]
    fn pointer_to_forward_placeholder_is_fixed_up() {
        let storage = spv::StorageClass::StorageBuffer as u32;
        let mut asm = Assembler::new();
        scalars(&mut asm);
        asm.op(spv::Op::TypeForwardPointer, &[10, storage]);
        asm.op(spv::Op::TypePointer, &[12, storage, 10]);
        asm.op(spv::Op::TypeStruct, &[11, 2]);
        asm.op(spv::Op::TypePointer, &[10, storage, 11]);
        let module = asm.parse().unwrap();

        let outer = module.get::<Type>(12).unwrap();
        assert_eq!(outer.basetype, BaseType::Struct);
        assert_eq!(&outer.member_types[..], &[2]);
        assert_eq!(outer.self_id, 11);
    }

    #[test]
    fn images() {
        let mut asm = Assembler::new();
        scalars(&mut asm);
        asm.op(spv::Op::TypeImage, &[
            10, 2, spv::Dim::Dim2D as u32, 1, 0, 0, 1,
            spv::ImageFormat::Unknown as u32,
        ]);
        asm.op(spv::Op::TypeSampledImage, &[11, 10]);
        asm.op(spv::Op::TypeSampler, &[12]);
        asm.op(spv::Op::TypeImage, &[
            13, 2, spv::Dim::Dim2D as u32, 0, 1, 0, 2,
            spv::ImageFormat::Rgba8 as u32,
            spv::AccessQualifier::WriteOnly as u32,
        ]);
        asm.op(spv::Op::TypeFunction, &[14, 1, 2, 3]);
        let module = asm.parse().unwrap();

        let image = module.get::<Type>(10).unwrap();
        assert_eq!(image.basetype, BaseType::Image);
        assert_eq!(image.image.dim, spv::Dim::Dim2D);
        assert!(image.image.depth && !image.image.arrayed);
        assert_eq!(image.image.access, None);

        let sampled = module.get::<Type>(11).unwrap();
        assert_eq!(sampled.basetype, BaseType::SampledImage);
        assert_eq!(sampled.self_id, 11);
        assert_eq!(sampled.image, image.image);

        assert_eq!(module.get::<Type>(12).unwrap().basetype, BaseType::Sampler);

        let storage = module.get::<Type>(13).unwrap();
        assert!(storage.image.arrayed);
        assert_eq!(storage.image.format, spv::ImageFormat::Rgba8);
        assert_eq!(storage.image.access, Some(spv::AccessQualifier::WriteOnly));

        let prototype = module.get::<FunctionPrototype>(14).unwrap();
        assert_eq!(prototype.return_type, 1);
        assert_eq!(prototype.parameter_types, vec![2, 3]);
    }
}
