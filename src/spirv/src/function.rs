use derivative::Derivative;
use spirv_headers as spv;

use crate::*;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Variable {
    pub ty: Id,
    pub storage: spv::StorageClass,
    pub initializer: Option<Id>,
    /// Stands in for an `OpPhi` result; see `Block::phi_edges`.
    pub phi_variable: bool,
}

impl Variable {
    pub fn new(ty: Id, storage: spv::StorageClass, initializer: Option<Id>) ->
        Self
    {
        Variable { ty, storage, initializer, phi_variable: false }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Parameter {
    pub ty: Id,
    pub id: Id,
}

#[derive(Clone, Debug, Derivative, Eq, PartialEq)]
#[derivative(Default)]
pub struct Function {
    pub return_type: Id,
    pub function_type: Id,
    #[derivative(Default(value = "spv::FunctionControl::NONE"))]
    pub control: spv::FunctionControl,
    pub parameters: Vec<Parameter>,
    pub local_variables: Vec<Id>,
    /// Blocks in the order they appear in the module.
    pub blocks: Vec<Id>,
    pub entry_block: Option<Id>,
}

impl Function {
    pub fn new(
        return_type: Id,
        function_type: Id,
        control: spv::FunctionControl,
    ) -> Self {
        Function { return_type, function_type, control, ..Default::default() }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FunctionPrototype {
    pub return_type: Id,
    pub parameter_types: Vec<Id>,
}

/// Raw `(literal, label)` words of an `OpSwitch`. The literal width
/// depends on the selector type, which the decoder does not track.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SwitchTargets {
    pub words: Vec<u32>,
}

impl SwitchTargets {
    /// Decodes cases for a selector of `literal_words` words (1 or 2).
    pub fn cases(&self, literal_words: usize) ->
        impl Iterator<Item = (u64, Id)> + '_
    {
        let stride = literal_words + 1;
        self.words.chunks_exact(stride).map(move |chunk| {
            let value = chunk[..literal_words].iter().rev()
                .fold(0u64, |acc, &word| (acc << 32) | word as u64);
            (value, chunk[literal_words])
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Terminator {
    Direct(Id),
    Select {
        condition: Id,
        true_block: Id,
        false_block: Id,
    },
    MultiSelect {
        selector: Id,
        default: Id,
        targets: SwitchTargets,
    },
    Return(Option<Id>),
    Kill,
    Unreachable,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Merge {
    None,
    Selection {
        merge_block: Id,
        control: spv::SelectionControl,
    },
    Loop {
        merge_block: Id,
        continue_block: Id,
        control: spv::LoopControl,
    },
}

impl Default for Merge {
    fn default() -> Self {
        Merge::None
    }
}

impl Merge {
    pub fn merge_block(&self) -> Option<Id> {
        match *self {
            Merge::None => None,
            Merge::Selection { merge_block, .. } => Some(merge_block),
            Merge::Loop { merge_block, .. } => Some(merge_block),
        }
    }

    pub fn continue_block(&self) -> Option<Id> {
        match *self {
            Merge::Loop { continue_block, .. } => Some(continue_block),
            _ => None,
        }
    }
}

/// One incoming edge of an `OpPhi`: `variable` takes `value` when control
/// arrives from `parent`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct PhiEdge {
    pub value: Id,
    pub parent: Id,
    pub variable: Id,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Block {
    /// `None` until the block's terminator is seen.
    pub terminator: Option<Terminator>,
    pub merge: Merge,
    pub phi_edges: Vec<PhiEdge>,
    /// Non-terminator instructions in order.
    pub ops: Vec<Instruction>,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ExtensionSet {
    Glsl,
    SpvAmdShaderBallot,
    SpvAmdShaderExplicitVertexParameter,
    SpvAmdShaderTrinaryMinmax,
    SpvAmdGcnShader,
    DebugInfo,
    NonSemanticDebugPrintf,
    NonSemanticGeneric,
    Unsupported,
}

impl ExtensionSet {
    pub fn from_name(name: &str) -> Self {
        match name {
            "GLSL.std.450" => ExtensionSet::Glsl,
            "SPV_AMD_shader_ballot" => ExtensionSet::SpvAmdShaderBallot,
            "SPV_AMD_shader_explicit_vertex_parameter" =>
                ExtensionSet::SpvAmdShaderExplicitVertexParameter,
            "SPV_AMD_shader_trinary_minmax" =>
                ExtensionSet::SpvAmdShaderTrinaryMinmax,
            "SPV_AMD_gcn_shader" => ExtensionSet::SpvAmdGcnShader,
            "DebugInfo" => ExtensionSet::DebugInfo,
            "NonSemantic.DebugPrintf" => ExtensionSet::NonSemanticDebugPrintf,
            _ if name.starts_with("NonSemantic.") =>
                ExtensionSet::NonSemanticGeneric,
            _ => ExtensionSet::Unsupported,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExtensionImport {
    pub set: ExtensionSet,
    pub name: String,
}

/// `OpString`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DebugString {
    pub value: String,
}

#[derive(Clone, Debug, Derivative, Eq, PartialEq)]
#[derivative(Default)]
pub struct EntryPoint {
    pub function: Id,
    pub name: String,
    #[derivative(Default(value = "spv::ExecutionModel::Vertex"))]
    pub execution_model: spv::ExecutionModel,
    pub interface: Vec<Id>,
    /// Raw `spv::ExecutionMode` values seen for this entry point.
    pub modes: Bitset,
    pub workgroup_size: [u32; 3],
    pub invocations: u32,
    pub output_vertices: u32,
}

impl EntryPoint {
    pub fn has_mode(&self, mode: spv::ExecutionMode) -> bool {
        self.modes.get(mode as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_cases() {
        let targets = SwitchTargets { words: vec![1, 10, 2, 20, 3, 30] };
        let narrow: Vec<_> = targets.cases(1).collect();
        assert_eq!(narrow, vec![(1, 10), (2, 20), (3, 30)]);

        let targets = SwitchTargets { words: vec![5, 1, 10, 0, 0, 20] };
        let wide: Vec<_> = targets.cases(2).collect();
        assert_eq!(wide, vec![((1 << 32) | 5, 10), (0, 20)]);
    }

    #[test]
    fn extension_sets() {
        assert_eq!(ExtensionSet::from_name("GLSL.std.450"), ExtensionSet::Glsl);
        assert_eq!(ExtensionSet::from_name("NonSemantic.Shader.DebugInfo.100"),
            ExtensionSet::NonSemanticGeneric);
        assert_eq!(ExtensionSet::from_name("OpenCL.std"),
            ExtensionSet::Unsupported);
    }
}
