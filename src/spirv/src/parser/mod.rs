use fnv::FnvHashMap;
use log::{debug, trace, warn};
use num_traits::FromPrimitive;
use spirv_headers as spv;

use crate::*;

mod annotations;
mod constants;
mod flow;
mod types;

// Not every `spirv_headers` release spells these the same way.
const OP_DECORATE_STRING: u16 = 5632;
const OP_MEMBER_DECORATE_STRING: u16 = 5633;

/// Reads the operands of one instruction front to back.
#[derive(Debug)]
pub(crate) struct Operands<'data> {
    opcode: u16,
    words: &'data [u32],
    // Word offset of `words[0]` in the module.
    offset: usize,
}

impl<'data> Operands<'data> {
    pub(crate) fn new(inst: &Instruction, words: &'data [u32]) -> Self {
        Operands {
            opcode: inst.opcode,
            words: inst.operands(words),
            offset: inst.offset,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Word offset of the next operand.
    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    fn advance(&mut self, count: usize) {
        self.words = &self.words[count..];
        self.offset += count;
    }

    pub(crate) fn consume(&mut self) -> Result<u32> {
        let &first = self.words.first()
            .ok_or(ErrorKind::MissingOperands(self.opcode))?;
        self.advance(1);
        Ok(first)
    }

    pub(crate) fn consume_option(&mut self) -> Option<u32> {
        self.consume().ok()
    }

    pub(crate) fn parse_enum<T: FromPrimitive>(&mut self) -> Result<T> {
        let word = self.consume()?;
        Ok(T::from_u32(word).ok_or(InvalidEnumValue(word))?)
    }

    /// Reads a nul-terminated literal string, packed little end first.
    pub(crate) fn parse_string(&mut self) -> Result<String> {
        let words = self.words;
        let mut bytes = Vec::new();
        for (i, word) in words.iter().enumerate() {
            for &byte in word.to_le_bytes().iter() {
                if byte == 0 {
                    self.advance(i + 1);
                    return Ok(String::from_utf8(bytes)
                        .map_err(|e| e.utf8_error())?);
                }
                bytes.push(byte);
            }
        }
        Err(ErrorKind::InvalidString.into())
    }

    /// Takes all remaining operands.
    pub(crate) fn rest(&mut self) -> &'data [u32] {
        let rest = self.words;
        self.advance(rest.len());
        rest
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Cursor {
    Outside,
    InFunction(Id),
    InBlock { function: Id, block: Id },
}

#[derive(Debug)]
pub(crate) struct Parser<'data> {
    words: &'data [u32],
    options: &'data ParseOptions,
    module: Module,
    cursor: Cursor,
    // Struct ids by debug name, for alias detection.
    struct_cache: FnvHashMap<String, Vec<Id>>,
    // `(pointer, pointee)` pairs whose pointee was a forward declaration.
    forward_pointer_fixups: Vec<(Id, Id)>,
}

/// Decodes a whole module. The buffer is byte-swapped in place first if
/// it was written in the opposite byte order.
pub(crate) fn parse_module(mut words: Vec<u32>, options: &ParseOptions) ->
    Result<Module>
{
    stream::fix_endianness(&mut words)?;
    let header = stream::read_header(&words);
    debug!("SPIR-V version {:#x}, generator {:#x}, bound {}",
        header.version, header.generator, header.bound);
    if header.bound > options.max_bound {
        debug!("id bound {} exceeds limit {}", header.bound, options.max_bound);
        return Err(ErrorKind::MalformedHeader.into());
    }

    let instructions = stream::frame(&words)?;
    let mut parser = Parser::new(&words, options, Module::with_header(header));
    for inst in instructions.iter() {
        parser.parse_instruction(inst).map_err(|e| e.at(inst.start()))?;
    }
    let mut module = parser.finish()?;

    module.words = words;
    Ok(module)
}

impl<'data> Parser<'data> {
    fn new(words: &'data [u32], options: &'data ParseOptions, module: Module) ->
        Self
    {
        Parser {
            words,
            options,
            module,
            cursor: Cursor::Outside,
            struct_cache: Default::default(),
            forward_pointer_fixups: Default::default(),
        }
    }

    fn ids(&self) -> &IdTable {
        &self.module.ids
    }

    fn declare<T: IdObject>(&mut self, id: Id, value: T) -> Result<&mut T> {
        self.module.ids.declare(id, value)
    }

    fn meta_mut(&mut self, id: Id) -> Result<&mut Meta> {
        self.module.meta.get_mut(id)
    }

    fn parse_instruction(&mut self, inst: &Instruction) -> Result<()> {
        let mut ops = Operands::new(inst, self.words);
        trace!("{:?} ({}) at word {}", inst.op(), inst.opcode, inst.start());

        match inst.opcode {
            OP_DECORATE_STRING => return self.parse_decorate_string(&mut ops),
            OP_MEMBER_DECORATE_STRING =>
                return self.parse_member_decorate_string(&mut ops),
            _ => {},
        }

        use spv::Op;
        match inst.op() {
            Some(Op::Nop)
            | Some(Op::SourceContinued)
            | Some(Op::SourceExtension)
            | Some(Op::ModuleProcessed)
            | Some(Op::DecorationGroup) => {},

            Some(Op::Capability) => self.parse_capability(&mut ops)?,
            Some(Op::Extension) => {
                let name = ops.parse_string()?;
                self.module.extensions.push(name);
            },
            Some(Op::ExtInstImport) => self.parse_ext_inst_import(&mut ops)?,
            Some(Op::MemoryModel) => {
                self.module.addressing_model = ops.parse_enum()?;
                self.module.memory_model = ops.parse_enum()?;
            },
            Some(Op::EntryPoint) => self.parse_entry_point(&mut ops)?,
            Some(Op::ExecutionMode) | Some(Op::ExecutionModeId) =>
                self.parse_execution_mode(&mut ops)?,
            Some(Op::Source) => self.parse_source(&mut ops)?,
            Some(Op::String) => {
                let id = ops.consume()?;
                let value = ops.parse_string()?;
                self.declare(id, DebugString { value })?;
            },
            Some(Op::Name) => {
                let id = ops.consume()?;
                let name = ops.parse_string()?;
                self.meta_mut(id)?.name = name;
            },
            Some(Op::MemberName) => {
                let id = ops.consume()?;
                let member = ops.consume()?;
                let name = ops.parse_string()?;
                self.meta_mut(id)?.member_mut(member)?.name = name;
            },

            Some(Op::Decorate) | Some(Op::DecorateId) =>
                self.parse_decorate(&mut ops)?,
            Some(Op::MemberDecorate) => self.parse_member_decorate(&mut ops)?,
            Some(Op::GroupDecorate) => self.parse_group_decorate(&mut ops)?,
            Some(Op::GroupMemberDecorate) =>
                self.parse_group_member_decorate(&mut ops)?,

            Some(Op::TypeVoid) => {
                let id = ops.consume()?;
                self.declare(id, Type::new(id, BaseType::Void, 0))?;
            },
            Some(Op::TypeBool) => {
                let id = ops.consume()?;
                self.declare(id, Type::new(id, BaseType::Boolean, 1))?;
            },
            Some(Op::TypeInt) => self.parse_type_int(&mut ops)?,
            Some(Op::TypeFloat) => self.parse_type_float(&mut ops)?,
            Some(Op::TypeVector) => self.parse_type_vector(&mut ops)?,
            Some(Op::TypeMatrix) => self.parse_type_matrix(&mut ops)?,
            Some(Op::TypeArray) => self.parse_type_array(&mut ops)?,
            Some(Op::TypeRuntimeArray) =>
                self.parse_type_runtime_array(&mut ops)?,
            Some(Op::TypeStruct) => self.parse_type_struct(&mut ops)?,
            Some(Op::TypePointer) => self.parse_type_pointer(&mut ops)?,
            Some(Op::TypeForwardPointer) =>
                self.parse_type_forward_pointer(&mut ops)?,
            Some(Op::TypeImage) => self.parse_type_image(&mut ops)?,
            Some(Op::TypeSampledImage) =>
                self.parse_type_sampled_image(&mut ops)?,
            Some(Op::TypeSampler) => {
                let id = ops.consume()?;
                self.declare(id, Type::new(id, BaseType::Sampler, 0))?;
            },
            Some(Op::TypeOpaque) => self.parse_type_opaque(&mut ops)?,
            Some(Op::TypeAccelerationStructureNV) => {
                let id = ops.consume()?;
                self.declare(id,
                    Type::new(id, BaseType::AccelerationStructure, 0))?;
            },
            Some(Op::TypeFunction) => self.parse_type_function(&mut ops)?,

            Some(Op::Constant) => self.parse_constant(&mut ops, false)?,
            Some(Op::SpecConstant) => self.parse_constant(&mut ops, true)?,
            Some(Op::ConstantTrue) =>
                self.parse_constant_bool(&mut ops, true, false)?,
            Some(Op::ConstantFalse) =>
                self.parse_constant_bool(&mut ops, false, false)?,
            Some(Op::SpecConstantTrue) =>
                self.parse_constant_bool(&mut ops, true, true)?,
            Some(Op::SpecConstantFalse) =>
                self.parse_constant_bool(&mut ops, false, true)?,
            Some(Op::ConstantNull) => self.parse_constant_null(&mut ops)?,
            Some(Op::ConstantComposite) =>
                self.parse_constant_composite(&mut ops, false)?,
            Some(Op::SpecConstantComposite) =>
                self.parse_constant_composite(&mut ops, true)?,
            Some(Op::SpecConstantOp) => self.parse_spec_constant_op(&mut ops)?,

            Some(Op::Undef) => {
                let ty = ops.consume()?;
                let id = ops.consume()?;
                self.declare(id, Undef { ty })?;
                if let Cursor::InBlock { block, .. } = self.cursor {
                    self.module.ids.get_mut::<Block>(block)?.ops.push(*inst);
                }
            },
            Some(Op::Variable) => self.parse_variable(inst, &mut ops)?,

            Some(Op::Function) => self.parse_function(&mut ops)?,
            Some(Op::FunctionParameter) =>
                self.parse_function_parameter(inst, &mut ops)?,
            Some(Op::FunctionEnd) => self.parse_function_end(inst)?,
            Some(Op::Label) => self.parse_label(&mut ops)?,
            Some(Op::Phi) => self.parse_phi(inst, &mut ops)?,
            Some(Op::SelectionMerge) =>
                self.parse_selection_merge(inst, &mut ops)?,
            Some(Op::LoopMerge) => self.parse_loop_merge(inst, &mut ops)?,

            Some(Op::Branch) => {
                let target = ops.consume()?;
                self.terminate(inst, Terminator::Direct(target))?;
            },
            Some(Op::BranchConditional) => {
                let condition = ops.consume()?;
                let true_block = ops.consume()?;
                let false_block = ops.consume()?;
                self.terminate(inst, Terminator::Select {
                    condition,
                    true_block,
                    false_block,
                })?;
            },
            Some(Op::Switch) => self.parse_switch(inst, &mut ops)?,
            Some(Op::Kill) => self.terminate(inst, Terminator::Kill)?,
            Some(Op::Return) => self.terminate(inst, Terminator::Return(None))?,
            Some(Op::ReturnValue) => {
                let value = ops.consume()?;
                self.terminate(inst, Terminator::Return(Some(value)))?;
            },
            Some(Op::Unreachable) =>
                self.terminate(inst, Terminator::Unreachable)?,

            op => self.parse_block_op(inst, op)?,
        }

        Ok(())
    }

    fn parse_capability(&mut self, ops: &mut Operands) -> Result<()> {
        let raw = ops.consume()?;
        match spv::Capability::from_u32(raw) {
            Some(spv::Capability::Kernel) =>
                Err(ErrorKind::UnrecognizedCapability(raw).into()),
            Some(capability) => {
                self.module.capabilities.push(capability);
                Ok(())
            },
            None => {
                warn!("unknown capability {}", raw);
                self.module.unknown_capabilities.push(raw);
                Ok(())
            },
        }
    }

    fn parse_ext_inst_import(&mut self, ops: &mut Operands) -> Result<()> {
        let id = ops.consume()?;
        let name = ops.parse_string()?;
        let set = ExtensionSet::from_name(&name);
        if set == ExtensionSet::Unsupported {
            if self.options.strict_extensions {
                return Err(ErrorKind::UnsupportedExtension(id).into());
            }
            warn!("unsupported extended instruction set \"{}\"", name);
        }
        self.declare(id, ExtensionImport { set, name })?;
        Ok(())
    }

    fn parse_entry_point(&mut self, ops: &mut Operands) -> Result<()> {
        let execution_model = ops.parse_enum()?;
        let function = ops.consume()?;
        let name = ops.parse_string()?;
        let interface = ops.rest().to_vec();

        let meta = self.meta_mut(function)?;
        if meta.name.is_empty() {
            meta.name = name.clone();
        }

        let module = &mut self.module;
        if module.entry_points.insert(function, EntryPoint {
            function,
            name,
            execution_model,
            interface,
            ..Default::default()
        }).is_none() {
            module.entry_point_order.push(function);
        }
        module.default_entry_point.get_or_insert(function);

        Ok(())
    }

    fn parse_execution_mode(&mut self, ops: &mut Operands) -> Result<()> {
        let function = ops.consume()?;
        let mode: spv::ExecutionMode = ops.parse_enum()?;
        let entry = self.module.entry_points.get_mut(&function)
            .ok_or(ErrorKind::UnknownId(function))?;
        entry.modes.set(mode as u32);
        match mode {
            spv::ExecutionMode::LocalSize => {
                for size in entry.workgroup_size.iter_mut() {
                    *size = ops.consume()?;
                }
            },
            spv::ExecutionMode::Invocations =>
                entry.invocations = ops.consume()?,
            spv::ExecutionMode::OutputVertices =>
                entry.output_vertices = ops.consume()?,
            _ => {},
        }
        Ok(())
    }

    fn parse_source(&mut self, ops: &mut Operands) -> Result<()> {
        let language: spv::SourceLanguage = ops.parse_enum()?;
        let version = ops.consume()?;
        let source = &mut self.module.source;
        *source = match language {
            spv::SourceLanguage::ESSL =>
                Source { version, es: true, hlsl: false, known: true },
            spv::SourceLanguage::GLSL =>
                Source { version, es: false, hlsl: false, known: true },
            spv::SourceLanguage::HLSL =>
                Source { version: 450, es: false, hlsl: true, known: true },
            _ => Source { known: false, ..*source },
        };
        Ok(())
    }

    fn finish(mut self) -> Result<Module> {
        match self.cursor {
            Cursor::Outside => {},
            Cursor::InFunction(_) =>
                return Err(ErrorKind::UnterminatedFunction.into()),
            Cursor::InBlock { .. } =>
                return Err(ErrorKind::UnterminatedBlock.into()),
        }

        for &(pointer, pointee) in self.forward_pointer_fixups.iter() {
            let target = self.module.ids.get::<Type>(pointee)?;
            let (basetype, member_types, self_id) = (
                target.basetype,
                target.member_types.clone(),
                target.self_id,
            );
            let ty = self.module.ids.get_mut::<Type>(pointer)?;
            ty.basetype = basetype;
            ty.member_types = member_types;
            ty.self_id = self_id;
        }

        for (id, ty) in self.module.ids.iter::<Type>() {
            if ty.forward_pointer {
                warn!("forward pointer %{} was never defined", id);
            }
        }

        Ok(self.module)
    }
}
