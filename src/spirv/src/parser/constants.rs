use spirv_headers as spv;

use crate::*;
use super::{Operands, Parser};

impl<'data> Parser<'data> {
    pub(super) fn parse_constant(&mut self, ops: &mut Operands, spec: bool) ->
        Result<()>
    {
        let ty = ops.consume()?;
        let id = ops.consume()?;
        let width = self.ids().get::<Type>(ty)?.width;
        let low = ops.consume()? as u64;
        let value = if width > 32 {
            let high = ops.consume()? as u64;
            (high << 32) | low
        } else { low };
        self.declare(id, Constant::scalar(ty, value, spec))?;
        Ok(())
    }

    pub(super) fn parse_constant_bool(
        &mut self,
        ops: &mut Operands,
        value: bool,
        spec: bool,
    ) -> Result<()> {
        let ty = ops.consume()?;
        let id = ops.consume()?;
        self.ids().get::<Type>(ty)?;
        self.declare(id, Constant::scalar(ty, value as u64, spec))?;
        Ok(())
    }

    pub(super) fn parse_constant_null(&mut self, ops: &mut Operands) -> Result<()> {
        let ty = ops.consume()?;
        let id = ops.consume()?;
        self.declare_null(id, ty)
    }

    // Aggregates get synthesized sub-constants so that the result stays
    // compositional.
    fn declare_null(&mut self, id: Id, ty_id: Id) -> Result<()> {
        let ty = self.ids().get::<Type>(ty_id)?.clone();
        let value = if ty.pointer {
            ConstantValue::Scalar(0)
        } else if let Some(&outer) = ty.array.last() {
            let length = match outer {
                ArraySize::Literal(length) => length,
                _ => return Err(ErrorKind::NonLiteralNullArray(ty_id).into()),
            };
            if length > self.options.max_bound {
                return Err(ErrorKind::LimitExceeded.into());
            }
            let element = ty.parent_type.ok_or(ErrorKind::TypeMismatch(ty_id))?;
            let sub = self.module.increase_bound_by(1);
            self.declare_null(sub, element)?;
            ConstantValue::Composite(vec![sub; length as usize])
        } else if ty.is_struct() {
            let mut synthesized: Vec<(Id, Id)> = Vec::new();
            let mut members = Vec::with_capacity(ty.member_types.len());
            for &member in ty.member_types.iter() {
                let sub = match synthesized.iter().find(|&&(ty, _)| ty == member) {
                    Some(&(_, sub)) => sub,
                    None => {
                        let sub = self.module.increase_bound_by(1);
                        self.declare_null(sub, member)?;
                        synthesized.push((member, sub));
                        sub
                    },
                };
                members.push(sub);
            }
            ConstantValue::Composite(members)
        } else {
            ConstantValue::zero(&ty)?
        };
        self.declare(id, Constant {
            ty: ty_id,
            value,
            specialization: false,
            null: true,
        })?;
        Ok(())
    }

    pub(super) fn parse_constant_composite(&mut self, ops: &mut Operands,
        spec: bool) -> Result<()>
    {
        let ty_id = ops.consume()?;
        let id = ops.consume()?;
        let elements = ops.rest();
        let ty = self.ids().get::<Type>(ty_id)?;

        let value = if !ty.array.is_empty() || ty.is_struct() {
            for &element in elements.iter() {
                if self.ids().entry(element).is_none() {
                    return Err(ErrorKind::UnknownId(element).into());
                }
            }
            ConstantValue::Composite(elements.to_vec())
        } else {
            let arity = elements.len() as u32;
            if arity > MAX_COMPOSITE_ELEMENTS {
                return Err(ErrorKind::UnsupportedCompositeArity(arity).into());
            }
            if ty.columns > 1 {
                let vecsize = ty.vecsize;
                let columns = elements.iter()
                    .map(|&column| self.column(column, vecsize, spec))
                    .collect::<Result<_>>()?;
                ConstantValue::Matrix(columns)
            } else {
                let elements = elements.iter()
                    .map(|&element| self.element(element, spec))
                    .collect::<Result<_>>()?;
                ConstantValue::Vector(ConstantVector { elements })
            }
        };

        self.declare(id, Constant {
            ty: ty_id,
            value,
            specialization: spec,
            null: false,
        })?;
        Ok(())
    }

    // Specialization expressions and undefs have no value yet, so they
    // read as zero.
    fn element(&self, id: Id, spec: bool) -> Result<ConstantElement> {
        match self.ids().entry(id) {
            Some(IdEntry::Constant(constant)) => {
                let value = constant.as_scalar()
                    .ok_or(ErrorKind::TypeMismatch(id))?;
                let spec_id = if constant.specialization { Some(id) } else { None };
                Ok(ConstantElement { value, spec_id })
            },
            Some(IdEntry::ConstantOp(_)) if spec =>
                Ok(ConstantElement { value: 0, spec_id: Some(id) }),
            Some(IdEntry::ConstantOp(_)) =>
                Err(ErrorKind::SpecConstantOpInConstant(id).into()),
            Some(IdEntry::Undef(_)) => Ok(Default::default()),
            Some(_) => Err(ErrorKind::TypeMismatch(id).into()),
            None => Err(ErrorKind::UnknownId(id).into()),
        }
    }

    fn column(&self, id: Id, vecsize: u32, spec: bool) -> Result<ConstantColumn> {
        match self.ids().entry(id) {
            Some(IdEntry::Constant(constant)) => {
                let vector = match constant.value {
                    ConstantValue::Vector(ref vector) => vector.clone(),
                    _ => return Err(ErrorKind::TypeMismatch(id).into()),
                };
                let spec_id = if constant.specialization { Some(id) } else { None };
                Ok(ConstantColumn { vector, spec_id })
            },
            Some(IdEntry::ConstantOp(_)) if spec => Ok(ConstantColumn {
                vector: ConstantVector::zero(vecsize),
                spec_id: Some(id),
            }),
            Some(IdEntry::ConstantOp(_)) =>
                Err(ErrorKind::SpecConstantOpInConstant(id).into()),
            Some(IdEntry::Undef(_)) => Ok(ConstantColumn {
                vector: ConstantVector::zero(vecsize),
                spec_id: None,
            }),
            Some(_) => Err(ErrorKind::TypeMismatch(id).into()),
            None => Err(ErrorKind::UnknownId(id).into()),
        }
    }

    pub(super) fn parse_spec_constant_op(&mut self, ops: &mut Operands) ->
        Result<()>
    {
        let ty = ops.consume()?;
        let id = ops.consume()?;
        let opcode: spv::Op = ops.parse_enum()?;
        let arguments = ops.rest().to_vec();
        self.ids().get::<Type>(ty)?;
        self.declare(id, SpecConstantOp { ty, opcode, arguments })?;
        Ok(())
    }
}
