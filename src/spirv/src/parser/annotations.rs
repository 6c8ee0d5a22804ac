use log::warn;
use num_traits::FromPrimitive;
use spirv_headers as spv;

use crate::*;
use super::{Operands, Parser};

fn parse_decoration(ops: &mut Operands) -> Result<Option<spv::Decoration>> {
    let raw = ops.consume()?;
    let decoration = spv::Decoration::from_u32(raw);
    if decoration.is_none() {
        warn!("skipping unknown decoration {}", raw);
    }
    Ok(decoration)
}

// Records the decoration plus its first literal, if any, and where that
// literal lives in the module.
fn apply(decorations: &mut Decorations, decoration: spv::Decoration,
    ops: &mut Operands)
{
    let offset = ops.offset();
    match ops.consume_option() {
        Some(value) => {
            decorations.set_value(decoration, value);
            decorations.set_word_offset(decoration, offset);
        },
        None => decorations.set_flag(decoration),
    }
}

impl<'data> Parser<'data> {
    pub(super) fn parse_decorate(&mut self, ops: &mut Operands) -> Result<()> {
        let target = ops.consume()?;
        let decoration = match parse_decoration(ops)? {
            Some(decoration) => decoration,
            None => return Ok(()),
        };
        apply(&mut self.meta_mut(target)?.decoration, decoration, ops);
        Ok(())
    }

    pub(super) fn parse_member_decorate(&mut self, ops: &mut Operands) ->
        Result<()>
    {
        let target = ops.consume()?;
        let member = ops.consume()?;
        let decoration = match parse_decoration(ops)? {
            Some(decoration) => decoration,
            None => return Ok(()),
        };
        let member = self.meta_mut(target)?.member_mut(member)?;
        apply(&mut member.decoration, decoration, ops);
        Ok(())
    }

    pub(super) fn parse_decorate_string(&mut self, ops: &mut Operands) ->
        Result<()>
    {
        let target = ops.consume()?;
        let decoration = match parse_decoration(ops)? {
            Some(decoration) => decoration,
            None => return Ok(()),
        };
        let value = ops.parse_string()?;
        self.meta_mut(target)?.decoration.set_string(decoration, value);
        Ok(())
    }

    pub(super) fn parse_member_decorate_string(&mut self, ops: &mut Operands) ->
        Result<()>
    {
        let target = ops.consume()?;
        let member = ops.consume()?;
        let decoration = match parse_decoration(ops)? {
            Some(decoration) => decoration,
            None => return Ok(()),
        };
        let value = ops.parse_string()?;
        self.meta_mut(target)?.member_mut(member)?.decoration
            .set_string(decoration, value);
        Ok(())
    }

    fn group_decorations(&mut self, group: Id) -> Result<Decorations> {
        Ok(self.meta_mut(group)?.decoration.clone())
    }

    pub(super) fn parse_group_decorate(&mut self, ops: &mut Operands) ->
        Result<()>
    {
        let group = ops.consume()?;
        let decorations = self.group_decorations(group)?;
        for &target in ops.rest() {
            self.meta_mut(target)?.decoration.copy_from(&decorations);
        }
        Ok(())
    }

    pub(super) fn parse_group_member_decorate(&mut self, ops: &mut Operands) ->
        Result<()>
    {
        let group = ops.consume()?;
        let decorations = self.group_decorations(group)?;
        let targets = ops.rest();
        if targets.len() % 2 != 0 {
            return Err(ErrorKind::MissingOperands(
                spv::Op::GroupMemberDecorate as u16).into());
        }
        for pair in targets.chunks_exact(2) {
            let member = self.meta_mut(pair[0])?.member_mut(pair[1])?;
            member.decoration.copy_from(&decorations);
        }
        Ok(())
    }
}
