#![cfg(test)]

use spirv_headers as spv;

use crate::*;

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Packs a literal string the way SPIR-V does: nul-terminated, padded to
/// whole words, low byte first.
pub(crate) fn string_words(s: &str) -> Vec<u32> {
    let mut bytes = s.as_bytes().to_vec();
    bytes.push(0);
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
    bytes.chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Builds a module word by word.
#[derive(Clone, Debug)]
pub(crate) struct Assembler {
    words: Vec<u32>,
}

impl Assembler {
    pub(crate) fn new() -> Self {
        Self::with_bound(64)
    }

    pub(crate) fn with_bound(bound: u32) -> Self {
        Assembler { words: vec![spv::MAGIC_NUMBER, 0x0001_0000, 0, bound, 0] }
    }

    /// Word offset at which the next instruction will start.
    pub(crate) fn len(&self) -> usize {
        self.words.len()
    }

    pub(crate) fn raw(&mut self, opcode: u16, operands: &[u32]) -> &mut Self {
        let count = operands.len() as u32 + 1;
        self.words.push((count << 16) | opcode as u32);
        self.words.extend_from_slice(operands);
        self
    }

    pub(crate) fn raw_string(&mut self, opcode: u16, leading: &[u32], s: &str) ->
        &mut Self
    {
        let mut operands = leading.to_vec();
        operands.extend(string_words(s));
        self.raw(opcode, &operands)
    }

    pub(crate) fn op(&mut self, op: spv::Op, operands: &[u32]) -> &mut Self {
        self.raw(op as u16, operands)
    }

    pub(crate) fn op_string(&mut self, op: spv::Op, leading: &[u32], s: &str) ->
        &mut Self
    {
        self.raw_string(op as u16, leading, s)
    }

    pub(crate) fn words(&self) -> &[u32] {
        &self.words
    }

    pub(crate) fn words_mut(&mut self) -> &mut [u32] {
        &mut self.words
    }

    pub(crate) fn parse(&self) -> Result<Module> {
        parse_words(&self.words)
    }
}

#[test]
fn strings_are_padded() {
    assert_eq!(string_words(""), vec![0]);
    assert_eq!(string_words("main"), vec![0x6e69_616d, 0]);
    assert_eq!(string_words("abc"), vec![0x0063_6261]);
}
