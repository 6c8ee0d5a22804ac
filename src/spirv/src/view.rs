use rspirv::dr::ModuleHeader;
use spirv_headers as spv;

use crate::*;

impl Module {
    pub fn header(&self) -> &ModuleHeader {
        &self.header
    }

    /// `(major, minor)` from the header's version word.
    pub fn version(&self) -> (u8, u8) {
        let word = self.header.version;
        ((word >> 16) as u8, (word >> 8) as u8)
    }

    /// The id bound, including any ids synthesized while parsing.
    pub fn bound(&self) -> u32 {
        self.ids.bound()
    }

    /// The whole module in host byte order; decoration word offsets index
    /// into this buffer.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn capabilities(&self) -> &[spv::Capability] {
        &self.capabilities
    }

    /// Raw values of declared capabilities `spv::Capability` can't name.
    pub fn unknown_capabilities(&self) -> &[u32] {
        &self.unknown_capabilities
    }

    pub fn has_capability(&self, capability: spv::Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn addressing_model(&self) -> spv::AddressingModel {
        self.addressing_model
    }

    pub fn memory_model(&self) -> spv::MemoryModel {
        self.memory_model
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn ids(&self) -> &IdTable {
        &self.ids
    }

    pub fn meta(&self) -> &MetaTable {
        &self.meta
    }

    pub fn get<T: IdObject>(&self, id: Id) -> Result<&T> {
        self.ids.get(id)
    }

    pub fn name(&self, id: Id) -> &str {
        self.meta.name(id)
    }

    /// Entry points in declaration order.
    pub fn entry_points(&self) -> impl ExactSizeIterator<Item = &EntryPoint> {
        // Every id in the order list has an entry.
        self.entry_point_order.iter().map(move |id| &self.entry_points[id])
    }

    pub fn entry_point(&self, function: Id) -> Option<&EntryPoint> {
        self.entry_points.get(&function)
    }

    pub fn get_entry_point(&self, name: &impl AsRef<str>) ->
        Option<&EntryPoint>
    {
        let name = name.as_ref();
        self.entry_points().find(|entry| entry.name == name)
    }

    /// Like `get_entry_point`, for modules that reuse a name across stages.
    pub fn get_entry_point_for_model(
        &self,
        name: &impl AsRef<str>,
        model: spv::ExecutionModel,
    ) -> Option<&EntryPoint> {
        let name = name.as_ref();
        self.entry_points()
            .find(|entry| entry.name == name && entry.execution_model == model)
    }

    /// The first entry point declared.
    pub fn default_entry_point(&self) -> Option<&EntryPoint> {
        self.entry_point(self.default_entry_point?)
    }

    pub fn functions(&self) -> impl Iterator<Item = (Id, &Function)> + '_ {
        self.ids.iter::<Function>()
    }

    /// Structured control flow roles of a block; empty if it has none.
    pub fn block_meta(&self, block: Id) -> BlockMeta {
        self.block_meta.get(&block).copied().unwrap_or_default()
    }

    pub fn loop_header_for(&self, continue_block: Id) -> Option<Id> {
        self.continue_block_to_loop_header.get(&continue_block).copied()
    }

    /// Operand words of an instruction recorded in a block.
    pub fn operands(&self, inst: &Instruction) -> &[u32] {
        inst.operands(&self.words)
    }
}
