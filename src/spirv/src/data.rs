use derivative::Derivative;
use fnv::FnvHashMap as HashMap;
use rspirv::dr::ModuleHeader;
use spirv_headers as spv;

use crate::*;

/// A decoded module. Built once by the parser and read-only afterward.
#[derive(Debug, Derivative)]
#[derivative(Default)]
pub struct Module {
    #[derivative(Default(value = "ModuleHeader::new(0)"))]
    pub(crate) header: ModuleHeader,
    /// The instruction stream in host byte order.
    pub(crate) words: Vec<u32>,
    pub(crate) ids: IdTable,
    pub(crate) meta: MetaTable,
    pub(crate) capabilities: Vec<spv::Capability>,
    // Enumerants newer than `spirv_headers`.
    pub(crate) unknown_capabilities: Vec<u32>,
    pub(crate) extensions: Vec<String>,
    // Keyed by function id.
    pub(crate) entry_points: HashMap<Id, EntryPoint>,
    pub(crate) entry_point_order: Vec<Id>,
    pub(crate) default_entry_point: Option<Id>,
    #[derivative(Default(value = "spv::AddressingModel::Logical"))]
    pub(crate) addressing_model: spv::AddressingModel,
    #[derivative(Default(value = "spv::MemoryModel::GLSL450"))]
    pub(crate) memory_model: spv::MemoryModel,
    pub(crate) source: Source,
    pub(crate) block_meta: HashMap<Id, BlockMeta>,
    pub(crate) continue_block_to_loop_header: HashMap<Id, Id>,
}

/// Source language information from `OpSource`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Source {
    pub version: u32,
    pub es: bool,
    pub hlsl: bool,
    /// False if the language was absent or not one of ESSL, GLSL or HLSL.
    pub known: bool,
}

impl Module {
    pub(crate) fn with_header(header: ModuleHeader) -> Self {
        let bound = header.bound;
        Module {
            header,
            ids: IdTable::with_bound(bound),
            meta: MetaTable::with_bound(bound),
            ..Default::default()
        }
    }

    /// Reserves `count` fresh ids in both tables and returns the first.
    pub(crate) fn increase_bound_by(&mut self, count: u32) -> Id {
        let first = self.ids.increase_bound_by(count);
        self.meta.grow(self.ids.bound());
        first
    }

    pub(crate) fn mark_block(&mut self, block: Id, flags: BlockMeta) {
        *self.block_meta.entry(block).or_default() |= flags;
    }
}
