use log::warn;
use spirv_headers as spv;

use crate::*;
use super::{Cursor, Operands, Parser};

impl<'data> Parser<'data> {
    fn current_function(&self, inst: &Instruction) -> Result<Id> {
        match self.cursor {
            Cursor::InFunction(function) | Cursor::InBlock { function, .. } =>
                Ok(function),
            Cursor::Outside =>
                Err(ErrorKind::InstructionOutsideFunction(inst.opcode).into()),
        }
    }

    fn current_block(&self, inst: &Instruction) -> Result<Id> {
        match self.cursor {
            Cursor::InBlock { block, .. } => Ok(block),
            _ => Err(ErrorKind::InstructionOutsideBlock(inst.opcode).into()),
        }
    }

    fn block_mut(&mut self, inst: &Instruction) -> Result<&mut Block> {
        let block = self.current_block(inst)?;
        self.module.ids.get_mut(block)
    }

    pub(super) fn parse_function(&mut self, ops: &mut Operands) -> Result<()> {
        if self.cursor != Cursor::Outside {
            return Err(ErrorKind::UnterminatedFunction.into());
        }
        let return_type = ops.consume()?;
        let id = ops.consume()?;
        let raw = ops.consume()?;
        let control = spv::FunctionControl::from_bits(raw)
            .ok_or(InvalidEnumValue(raw))?;
        let function_type = ops.consume()?;
        self.ids().get::<FunctionPrototype>(function_type)?;
        self.declare(id, Function::new(return_type, function_type, control))?;
        self.cursor = Cursor::InFunction(id);
        Ok(())
    }

    pub(super) fn parse_function_parameter(
        &mut self,
        inst: &Instruction,
        ops: &mut Operands,
    ) -> Result<()> {
        let function = self.current_function(inst)?;
        let ty = ops.consume()?;
        let id = ops.consume()?;
        self.declare(id,
            Variable::new(ty, spv::StorageClass::Function, None))?;
        self.module.ids.get_mut::<Function>(function)?
            .parameters.push(Parameter { ty, id });
        Ok(())
    }

    pub(super) fn parse_function_end(&mut self, inst: &Instruction) -> Result<()>
    {
        match self.cursor {
            Cursor::Outside => Err(
                ErrorKind::InstructionOutsideFunction(inst.opcode).into()),
            Cursor::InBlock { .. } => Err(ErrorKind::UnterminatedBlock.into()),
            Cursor::InFunction(_) => {
                self.cursor = Cursor::Outside;
                Ok(())
            },
        }
    }

    pub(super) fn parse_label(&mut self, ops: &mut Operands) -> Result<()> {
        let function = match self.cursor {
            Cursor::Outside =>
                return Err(ErrorKind::BlockOutsideFunction.into()),
            Cursor::InBlock { .. } =>
                return Err(ErrorKind::UnterminatedBlock.into()),
            Cursor::InFunction(function) => function,
        };
        let block = ops.consume()?;
        self.declare(block, Block::default())?;

        let function_data = self.module.ids.get_mut::<Function>(function)?;
        function_data.blocks.push(block);
        function_data.entry_block.get_or_insert(block);
        self.cursor = Cursor::InBlock { function, block };
        Ok(())
    }

    pub(super) fn parse_variable(&mut self, inst: &Instruction,
        ops: &mut Operands) -> Result<()>
    {
        let ty = ops.consume()?;
        let id = ops.consume()?;
        let storage = ops.parse_enum()?;
        let initializer = ops.consume_option();
        self.ids().get::<Type>(ty)?;

        if storage == spv::StorageClass::Function {
            let function = self.current_function(inst)?;
            self.module.ids.get_mut::<Function>(function)?
                .local_variables.push(id);
        }
        self.declare(id, Variable::new(ty, storage, initializer))?;
        Ok(())
    }

    // Phi results become function locals; each incoming edge is recorded
    // so that a later pass can assign the value in the predecessor.
    pub(super) fn parse_phi(&mut self, inst: &Instruction, ops: &mut Operands) ->
        Result<()>
    {
        let function = self.current_function(inst)?;
        let block = self.current_block(inst)?;
        let ty = ops.consume()?;
        let variable = ops.consume()?;
        let edges = ops.rest();
        if edges.len() % 2 != 0 {
            return Err(ErrorKind::MissingOperands(inst.opcode).into());
        }

        let mut local = Variable::new(ty, spv::StorageClass::Function, None);
        local.phi_variable = true;
        self.declare(variable, local)?;
        self.module.ids.get_mut::<Function>(function)?
            .local_variables.push(variable);

        let block = self.module.ids.get_mut::<Block>(block)?;
        block.phi_edges.extend(edges.chunks_exact(2).map(|edge| PhiEdge {
            value: edge[0],
            parent: edge[1],
            variable,
        }));
        Ok(())
    }

    pub(super) fn parse_selection_merge(&mut self, inst: &Instruction,
        ops: &mut Operands) -> Result<()>
    {
        let merge_block = ops.consume()?;
        let raw = ops.consume()?;
        let control = spv::SelectionControl::from_bits(raw)
            .ok_or(InvalidEnumValue(raw))?;
        self.block_mut(inst)?.merge = Merge::Selection { merge_block, control };
        self.module.mark_block(merge_block, BlockMeta::SELECTION_MERGE);
        Ok(())
    }

    pub(super) fn parse_loop_merge(&mut self, inst: &Instruction,
        ops: &mut Operands) -> Result<()>
    {
        let header = self.current_block(inst)?;
        let merge_block = ops.consume()?;
        let continue_block = ops.consume()?;
        let raw = ops.consume()?;
        let control = spv::LoopControl::from_bits(raw)
            .ok_or(InvalidEnumValue(raw))?;
        self.block_mut(inst)?.merge = Merge::Loop {
            merge_block,
            continue_block,
            control,
        };

        let module = &mut self.module;
        module.mark_block(header, BlockMeta::LOOP_HEADER);
        module.mark_block(merge_block, BlockMeta::LOOP_MERGE);
        module.continue_block_to_loop_header.insert(continue_block, header);
        // A self-loop header must stay a valid branch target.
        if continue_block != header {
            module.mark_block(continue_block, BlockMeta::CONTINUE);
        }
        Ok(())
    }

    pub(super) fn parse_switch(&mut self, inst: &Instruction, ops: &mut Operands)
        -> Result<()>
    {
        let selector = ops.consume()?;
        let default = ops.consume()?;
        let targets = SwitchTargets { words: ops.rest().to_vec() };

        // Branches to the merge block from inside the switch are breaks.
        let merge = self.block_mut(inst)?.merge;
        if let Merge::Selection { merge_block, .. } = merge {
            self.module.mark_block(merge_block, BlockMeta::MULTISELECT_MERGE);
        }
        self.terminate(inst, Terminator::MultiSelect { selector, default, targets })
    }

    pub(super) fn terminate(&mut self, inst: &Instruction, terminator: Terminator)
        -> Result<()>
    {
        let function = self.current_function(inst)?;
        self.block_mut(inst)?.terminator = Some(terminator);
        self.cursor = Cursor::InFunction(function);
        Ok(())
    }

    /// Records an instruction that is not interpreted here in the open
    /// block.
    pub(super) fn parse_block_op(&mut self, inst: &Instruction,
        op: Option<spv::Op>) -> Result<()>
    {
        match (self.cursor, op) {
            (Cursor::InBlock { block, .. }, _) => {
                if op.is_none() {
                    warn!("unknown opcode {} at word {}", inst.opcode,
                        inst.start());
                }
                self.module.ids.get_mut::<Block>(block)?.ops.push(*inst);
                Ok(())
            },
            // Debug info may appear between functions.
            (_, Some(spv::Op::Line))
            | (_, Some(spv::Op::NoLine))
            | (_, Some(spv::Op::ExtInst)) => Ok(()),
            _ => Err(ErrorKind::InstructionOutsideBlock(inst.opcode).into()),
        }
    }
}
