use log::debug;
use num_traits::FromPrimitive;
use rspirv::dr::ModuleHeader;
use spirv_headers as spv;

use crate::*;

pub(crate) const HEADER_LEN: usize = 5;

// Not every version word is meaningful, so this is a list and not a range.
const SUPPORTED_VERSIONS: &[u32] = &[
    0x0001_0000,
    0x0001_0100,
    0x0001_0200,
    0x0001_0300,
    0x0001_0400,
    0x0001_0500,
    0x0001_0600,
];

/// A framed instruction. Operands are referenced by position in the
/// module's word buffer rather than copied.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Instruction {
    pub opcode: u16,
    pub word_count: u16,
    /// Word offset of the first operand.
    pub offset: usize,
    /// Number of operand words.
    pub length: usize,
}

impl Instruction {
    /// Returns `None` for opcodes `spirv_headers` doesn't know.
    pub fn op(&self) -> Option<spv::Op> {
        spv::Op::from_u32(self.opcode as u32)
    }

    pub fn operands<'w>(&self, words: &'w [u32]) -> &'w [u32] {
        &words[self.offset..self.offset + self.length]
    }

    /// Word offset of the instruction's leading opcode word.
    pub fn start(&self) -> usize {
        self.offset - 1
    }
}

fn decode_op(word: u32) -> (u16, u16) {
    let opcode = (word & 0xffff) as u16;
    let word_count = (word >> 16) as u16;
    (opcode, word_count)
}

/// Validates the fixed header. If the magic number reads byte-swapped, the
/// whole buffer is swapped once before validation.
pub(crate) fn fix_endianness(words: &mut [u32]) -> Result<()> {
    if words.len() < HEADER_LEN {
        return Err(ErrorKind::MalformedHeader.into());
    }

    if words[0] == spv::MAGIC_NUMBER.swap_bytes() {
        debug!("swapping byte order of {} words", words.len());
        for word in words.iter_mut() {
            *word = word.swap_bytes();
        }
    }

    if words[0] != spv::MAGIC_NUMBER || !SUPPORTED_VERSIONS.contains(&words[1]) {
        return Err(ErrorKind::MalformedHeader.into());
    }

    Ok(())
}

/// Reads the header of an already validated buffer.
pub(crate) fn read_header(words: &[u32]) -> ModuleHeader {
    let mut header = ModuleHeader::new(words[3]);
    header.magic_number = words[0];
    header.version = words[1];
    header.generator = words[2];
    header.reserved_word = words[4];
    header
}

/// Splits the instruction stream following the header into instructions,
/// without interpreting any operands.
pub(crate) fn frame(words: &[u32]) -> Result<Vec<Instruction>> {
    let mut instructions = Vec::new();
    let mut offset = HEADER_LEN;
    while offset < words.len() {
        let (opcode, word_count) = decode_op(words[offset]);
        if word_count == 0 {
            return Err(Error::from(ErrorKind::ZeroLengthInstruction).at(offset));
        }

        let end = offset + word_count as usize;
        if end > words.len() {
            return Err(Error::from(ErrorKind::TruncatedInstruction).at(offset));
        }

        instructions.push(Instruction {
            opcode,
            word_count,
            offset: offset + 1,
            length: word_count as usize - 1,
        });
        offset = end;
    }
    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<u32> {
        vec![spv::MAGIC_NUMBER, 0x0001_0000, 0, 8, 0]
    }

    #[test]
    fn short_buffer() {
        for len in 0..HEADER_LEN {
            let mut words = header();
            words.truncate(len);
            let err = fix_endianness(&mut words).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedHeader);
        }
    }

    #[test]
    fn bad_magic_and_version() {
        let mut words = header();
        words[0] = 0xdeadbeef;
        assert!(fix_endianness(&mut words).is_err());

        let mut words = header();
        words[1] = 0x0001_0001;
        assert_eq!(fix_endianness(&mut words).unwrap_err().kind(),
            ErrorKind::MalformedHeader);
    }

    #[test]
    fn swapped_header() {
        let mut words = header();
        words.push((2 << 16) | 17);
        words.push(1);
        let mut swapped: Vec<_> = words.iter().map(|w| w.swap_bytes()).collect();
        fix_endianness(&mut swapped).unwrap();
        assert_eq!(swapped, words);
    }

    #[test]
    fn framing() {
        let mut words = header();
        // OpCapability Shader
        words.extend(&[(2 << 16) | 17, 1]);
        // OpTypeVoid %1
        words.extend(&[(2 << 16) | 19, 1]);
        let insts = frame(&words).unwrap();
        assert_eq!(insts.len(), 2);
        assert_eq!(insts[0].op(), Some(spv::Op::Capability));
        assert_eq!(insts[0].operands(&words), &[1]);
        assert_eq!(insts[1].start(), 7);
        assert_eq!(insts[1].word_count, 2);
        assert_eq!(insts[1].op(), Some(spv::Op::TypeVoid));
    }

    #[test]
    fn zero_length() {
        let mut words = header();
        words.push(19);
        let err = frame(&words).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ZeroLengthInstruction);
        assert_eq!(err.offset(), Some(HEADER_LEN));
    }

    #[test]
    fn truncated() {
        let mut words = header();
        words.extend(&[(2 << 16) | 17, 1]);
        // Claims four words but only two remain.
        words.extend(&[(4 << 16) | 21, 2]);
        let err = frame(&words).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TruncatedInstruction);
        assert_eq!(err.offset(), Some(7));
    }

    #[test]
    fn header_fields() {
        let words = header();
        let header = read_header(&words);
        assert_eq!(header.bound, 8);
        assert_eq!(header.version(), (1, 0));
    }
}
