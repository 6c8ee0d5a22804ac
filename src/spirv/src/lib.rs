//! Decodes SPIR-V binaries into a typed, id-indexed intermediate
//! representation: types, constants, variables, functions and blocks,
//! annotated with the structured control flow needed to rebuild loops,
//! selections and switches.

use derivative::Derivative;

mod constant;
mod data;
mod error;
mod function;
mod ids;
mod meta;
mod parser;
mod stream;
mod testing;
mod types;
mod view;

pub use constant::*;
pub use data::{Module, Source};
pub use error::*;
pub use function::*;
pub use ids::*;
pub use meta::*;
pub use stream::Instruction;
pub use types::*;

pub use rspirv::dr::ModuleHeader;
pub use spirv_headers as spv;

/// Largest id bound accepted by default, the universal limit for ids.
pub const DEFAULT_MAX_BOUND: u32 = 0x3f_ffff;

#[derive(Clone, Copy, Debug, Derivative, Eq, PartialEq)]
#[derivative(Default)]
pub struct ParseOptions {
    /// Fail on extended instruction sets the decoder doesn't recognize
    /// instead of recording them as unsupported.
    pub strict_extensions: bool,
    /// Modules declaring a larger id bound are rejected as malformed.
    #[derivative(Default(value = "DEFAULT_MAX_BOUND"))]
    pub max_bound: u32,
}

pub fn parse_words(words: &[u32]) -> Result<Module> {
    parse_words_with_options(words, &Default::default())
}

pub fn parse_words_with_options(words: &[u32], options: &ParseOptions) ->
    Result<Module>
{
    parser::parse_module(words.to_vec(), options)
}

/// Parses a module from its in-memory bytes. Either byte order is
/// accepted.
pub fn parse_bytes(bytes: &[u8]) -> Result<Module> {
    let word_size = std::mem::size_of::<u32>();
    if bytes.len() < stream::HEADER_LEN * word_size {
        return Err(ErrorKind::MalformedHeader.into());
    }
    if bytes.len() % word_size != 0 {
        return Err(ErrorKind::TruncatedInstruction.into());
    }
    let words = bytes.chunks_exact(word_size)
        .map(|chunk| u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    parser::parse_module(words, &Default::default())
}
