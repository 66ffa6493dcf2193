//! Bytecode builder and textual assembler.
//!
//! [`Assembler`] is the single source of truth for the wire encoding: it appends
//! opcode bytes (via [`Opcode::to_byte`]) and raw operand bytes, nothing else.
//! It performs no validation; a malformed layout such as a `PUSH4` followed by two
//! bytes only surfaces when the machine decodes it.
//!
//! On top of it, [`assemble_source`] turns line-oriented assembly into bytecode.
//!
//! # Syntax
//!
//! ```text
//! INSTRUCTION [operand]  # optional comment
//! ```
//!
//! - Mnemonics are case-insensitive (`PUSH2`, `dup1`, `IsZero`)
//! - `PUSHn` takes one operand, a decimal or `0x`-prefixed hex literal that must fit in
//!   `n` bytes; it is left-padded to exactly `n` bytes
//! - Bare `PUSH` picks the narrowest width that holds its operand
//! - Comments start with `#`; commas are treated as whitespace

use crate::error;
use crate::types::bytecode::Bytecode;
use crate::types::word::{WORD_LEN, Word};
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Opcode;
use primitive_types::U256;
use std::fmt::Write;
use std::fs;
use std::path::Path;

const COMMENT_CHAR: char = '#';
const HEX_PREFIX: &str = "0x";

/// Incremental bytecode builder.
///
/// ```ignore
/// let mut asm = Assembler::new();
/// asm.compile(Opcode::Push(1), &[2]).compile(Opcode::IsZero, &[]);
/// let code = asm.to_bytes();
/// ```
#[derive(Clone, Debug, Default)]
pub struct Assembler {
    code: Vec<u8>,
}

impl Assembler {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `opcode` followed by `operands` verbatim.
    pub fn compile(&mut self, opcode: Opcode, operands: &[u8]) -> &mut Self {
        self.code.push(opcode.to_byte());
        self.code.extend_from_slice(operands);
        self
    }

    /// Appends the opcode `base + n` followed by `operands`.
    ///
    /// Selects a family member by offset from its first member:
    /// `compile_adjust(Opcode::Push(1), 3, ..)` emits `PUSH4`.
    pub fn compile_adjust(&mut self, base: Opcode, n: u8, operands: &[u8]) -> &mut Self {
        self.code.push(base.to_byte().wrapping_add(n));
        self.code.extend_from_slice(operands);
        self
    }

    /// Appends the narrowest `PUSHn` that holds `word`.
    pub fn push_word(&mut self, word: Word) -> &mut Self {
        let bytes = word.to_minimal_bytes();
        self.compile_adjust(Opcode::Push(1), (bytes.len() - 1) as u8, &bytes)
    }

    /// Appends raw bytes with no opcode.
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.code.extend_from_slice(bytes);
        self
    }

    /// Number of bytes emitted so far.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Returns the emitted bytecode.
    pub fn to_bytes(&self) -> Bytecode {
        Bytecode::new(self.code.as_slice())
    }

    /// Consumes the builder and returns the emitted bytecode.
    pub fn into_bytes(self) -> Bytecode {
        Bytecode::new(self.code)
    }
}

#[derive(Debug, Clone)]
struct Token<'a> {
    text: &'a str,
    /// 1-based column offset in the line.
    offset: usize,
}

/// Splits one line into whitespace/comma separated tokens, dropping any comment.
fn tokenize(line: &str) -> Vec<Token<'_>> {
    let code = line.split(COMMENT_CHAR).next().unwrap_or_default();
    let mut out = Vec::with_capacity(2);
    let mut start: Option<usize> = None;

    let mut start_col: usize = 0;

    for (col, (i, c)) in code.char_indices().enumerate() {
        let separator = c.is_whitespace() || c == ',';
        match (start, separator) {
            (None, false) => {
                start = Some(i);
                start_col = col + 1;
            }
            (Some(s), true) => {
                out.push(Token {
                    text: &code[s..i],
                    offset: start_col,
                });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push(Token {
            text: &code[s..],
            offset: start_col,
        });
    }
    out
}

/// Parses a decimal or `0x`-prefixed hex literal.
pub(crate) fn parse_word(tok: &str) -> Result<Word, VMError> {
    let invalid = || VMError::InvalidOperand {
        token: tok.to_string(),
    };
    match tok.strip_prefix(HEX_PREFIX) {
        Some(digits) => {
            if digits.is_empty()
                || digits.len() > 2 * WORD_LEN
                || !digits.bytes().all(|b| b.is_ascii_hexdigit())
            {
                return Err(invalid());
            }
            let padded = format!("{digits:0>64}");
            let bytes = Bytecode::from_hex(&padded).map_err(|_| invalid())?;
            Ok(Word::from_bytes(&bytes))
        }
        None => {
            if tok.is_empty() || !tok.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            U256::from_dec_str(tok)
                .map(Word::from)
                .map_err(|_| invalid())
        }
    }
}

/// Encodes `word` as exactly `width` big-endian bytes.
fn push_operand(opcode: &str, word: Word, width: usize) -> Result<Vec<u8>, VMError> {
    if word.byte_len() > width {
        return Err(VMError::OperandTooWide {
            instruction: opcode.to_string(),
            width,
            actual: word.byte_len(),
        });
    }
    Ok(word.to_bytes()[WORD_LEN - width..].to_vec())
}

/// Assembles one tokenized line into `asm`.
fn assemble_line(asm: &mut Assembler, tokens: &[Token]) -> Result<(), VMError> {
    let name = tokens[0].text;
    let operands = &tokens[1..];

    let arity = |expected: usize| {
        if operands.len() == expected {
            Ok(())
        } else {
            Err(VMError::ArityMismatch {
                instruction: name.to_string(),
                expected,
                actual: operands.len(),
            })
        }
    };

    if name.eq_ignore_ascii_case("PUSH") {
        arity(1)?;
        asm.push_word(parse_word(operands[0].text)?);
        return Ok(());
    }

    let opcode = Opcode::from_mnemonic(name)?;
    match opcode {
        Opcode::Push(width) => {
            arity(1)?;
            let word = parse_word(operands[0].text)?;
            let bytes = push_operand(name, word, width as usize)?;
            asm.compile(opcode, &bytes);
        }
        _ => {
            arity(0)?;
            asm.compile(opcode, &[]);
        }
    }
    Ok(())
}

/// Column to blame for an error raised while assembling `tokens`.
fn error_column(err: &VMError, tokens: &[Token]) -> usize {
    match err {
        VMError::InvalidOperand { .. } | VMError::OperandTooWide { .. } => tokens
            .get(1)
            .map(|t| t.offset)
            .unwrap_or(tokens[0].offset),
        VMError::ArityMismatch { expected, .. } => tokens
            .get(expected + 1)
            .map(|t| t.offset)
            .unwrap_or(tokens[0].offset),
        _ => tokens[0].offset,
    }
}

/// Assembles source text into bytecode.
///
/// Errors are reported as [`VMError::AssemblyError`] with the 1-based line and column
/// of the offending token.
pub fn assemble_source(source: &str) -> Result<Bytecode, VMError> {
    let mut asm = Assembler::new();
    for (idx, line) in source.lines().enumerate() {
        let tokens = tokenize(line);
        if tokens.is_empty() {
            continue;
        }
        assemble_line(&mut asm, &tokens).map_err(|err| VMError::AssemblyError {
            line: idx + 1,
            offset: error_column(&err, &tokens),
            source: err.to_string(),
        })?;
    }
    Ok(asm.into_bytes())
}

/// Reads and assembles the file at `path`.
///
/// Read and assembly failures are also logged to stderr, assembly failures as a
/// rendered diagnostic.
pub fn assemble_file(path: impl AsRef<Path>) -> Result<Bytecode, VMError> {
    let path = path.as_ref();
    let file = path.display().to_string();
    let source = fs::read_to_string(path)
        .map_err(|e| VMError::IoError(format!("{file}: {e}")))
        .inspect_err(|err| log_assembly_error(&file, "", err))?;
    assemble_source(&source).inspect_err(|err| log_assembly_error(&file, &source, err))
}

/// Formats a compiler-style diagnostic for assembly failures.
pub fn render_assembly_diagnostic(
    file: &str,
    source: &str,
    line: usize,
    offset: usize,
    message: &str,
) -> String {
    let mut diag = String::new();
    let _ = writeln!(diag, "error: {message}");
    let _ = writeln!(diag, " --> {file}:{line}:{offset}");

    if let Some(raw_line) = source.lines().nth(line.saturating_sub(1)) {
        let line_text = raw_line.trim_end_matches('\r');
        let underline = " ".repeat(offset.saturating_sub(1));
        let _ = writeln!(diag, "     |");
        let _ = writeln!(diag, "{:>4} | {}", line, line_text);
        let _ = writeln!(diag, "     | {}^", underline);
    }

    diag
}

fn log_assembly_error(file: &str, source: &str, err: &VMError) {
    match err {
        VMError::AssemblyError {
            line,
            offset,
            source: message,
        } => error!(
            "{}",
            render_assembly_diagnostic(file, source, *line, *offset, message)
        ),
        other => error!("{other}"),
    }
}

/// Renders bytecode as assembly, one instruction per line.
///
/// Each line ends with a `# offset` comment, so the output of well-formed bytecode
/// assembles back to the same bytes. Unknown bytes and truncated pushes are emitted as
/// comment-only lines.
pub fn disassemble(code: &[u8]) -> String {
    let mut out = String::new();
    let mut pc = 0;
    while pc < code.len() {
        let byte = code[pc];
        let opcode = match Opcode::from_byte(byte) {
            Ok(op) => op,
            Err(_) => {
                let _ = writeln!(out, "# {pc:04x}: invalid opcode 0x{byte:02x}");
                pc += 1;
                continue;
            }
        };
        let width = opcode.operand_len();
        let operand = &code[(pc + 1).min(code.len())..(pc + 1 + width).min(code.len())];
        let hex: String = operand.iter().map(|b| format!("{b:02x}")).collect();
        if operand.len() < width {
            let _ = writeln!(
                out,
                "# {pc:04x}: {opcode} truncated, operand 0x{hex} ({} of {width} bytes)",
                operand.len()
            );
        } else if width > 0 {
            let _ = writeln!(out, "{opcode} 0x{hex}  # {pc:04x}");
        } else {
            let _ = writeln!(out, "{opcode}  # {pc:04x}");
        }
        pc += 1 + width;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assemble_err(source: &str) -> (usize, usize, String) {
        match assemble_source(source) {
            Err(VMError::AssemblyError {
                line,
                offset,
                source,
            }) => (line, offset, source),
            other => panic!("expected assembly error, got {other:?}"),
        }
    }

    #[test]
    fn compile_appends_opcode_and_operands() {
        let mut asm = Assembler::new();
        asm.compile(Opcode::Push(1), &[2])
            .compile(Opcode::IsZero, &[])
            .compile(Opcode::Push(2), &[0x01, 0x02]);
        assert_eq!(
            asm.to_bytes().as_slice(),
            &[0x60, 0x02, 0x15, 0x61, 0x01, 0x02]
        );
        assert_eq!(asm.len(), 6);
    }

    #[test]
    fn compile_adjust_offsets_the_base_opcode() {
        let mut asm = Assembler::new();
        asm.compile_adjust(Opcode::Push(1), 2, &[1, 2, 3])
            .compile_adjust(Opcode::Dup(1), 15, &[])
            .compile_adjust(Opcode::Swap(1), 0, &[]);
        assert_eq!(asm.to_bytes().as_slice(), &[0x62, 1, 2, 3, 0x8F, 0x90]);
    }

    #[test]
    fn compile_adjust_agrees_with_family_encoding() {
        for n in 0..32u8 {
            let mut adjusted = Assembler::new();
            adjusted.compile_adjust(Opcode::Push(1), n, &[]);
            let mut direct = Assembler::new();
            direct.compile(Opcode::Push(n + 1), &[]);
            assert_eq!(adjusted.to_bytes(), direct.to_bytes());
        }
    }

    #[test]
    fn compile_does_not_validate_layout() {
        let mut asm = Assembler::new();
        asm.compile(Opcode::Push(4), &[1]).raw(&[0xFE]);
        assert_eq!(asm.to_bytes().as_slice(), &[0x63, 1, 0xFE]);
    }

    #[test]
    fn push_word_picks_narrowest_width() {
        let mut asm = Assembler::new();
        asm.push_word(Word::ZERO)
            .push_word(Word::from_int(0x0102))
            .push_word(Word::MAX);
        let code = asm.into_bytes();
        assert_eq!(&code[..5], &[0x60, 0x00, 0x61, 0x01, 0x02]);
        assert_eq!(code[5], 0x7F);
        assert_eq!(code.len(), 5 + 1 + 32);
    }

    #[test]
    fn tokenize_handles_commas_and_comments() {
        let tokens = tokenize("  PUSH2 0x0102, # trailing");
        let texts: Vec<_> = tokens.iter().map(|t| (t.text, t.offset)).collect();
        assert_eq!(texts, vec![("PUSH2", 3), ("0x0102", 9)]);
        assert!(tokenize("# only a comment").is_empty());
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn parse_word_literals() {
        assert_eq!(parse_word("42").unwrap(), Word::from_int(42));
        assert_eq!(parse_word("0xff").unwrap(), Word::from_int(255));
        assert_eq!(parse_word("0x0001").unwrap(), Word::ONE);
        let max = format!("0x{}", "f".repeat(64));
        assert_eq!(parse_word(&max).unwrap(), Word::MAX);
        for bad in ["", "0x", "-1", "12a", "0xgg", "r1"] {
            assert!(parse_word(bad).is_err(), "{bad}");
        }
        assert!(parse_word(&format!("0x1{}", "0".repeat(64))).is_err());
    }

    #[test]
    fn assemble_source_basic_program() {
        let code = assemble_source(
            "
            # push two values and compare
            PUSH1 2
            iszero
            PUSH2 0x0304, # commas are fine
            DUP2
            SWAP1
            ",
        )
        .unwrap();
        assert_eq!(
            code.as_slice(),
            &[0x60, 0x02, 0x15, 0x61, 0x03, 0x04, 0x81, 0x90]
        );
    }

    #[test]
    fn assemble_source_pads_push_operands() {
        let code = assemble_source("PUSH4 1").unwrap();
        assert_eq!(code.as_slice(), &[0x63, 0, 0, 0, 1]);
    }

    #[test]
    fn assemble_source_bare_push() {
        let code = assemble_source("PUSH 256\nPUSH 0").unwrap();
        assert_eq!(code.as_slice(), &[0x61, 0x01, 0x00, 0x60, 0x00]);
    }

    #[test]
    fn operand_too_wide_is_reported_with_column() {
        let (line, offset, message) = assemble_err("ADD\nPUSH1 256");
        assert_eq!(line, 2);
        assert_eq!(offset, 7);
        assert!(message.contains("needs 2 bytes"), "{message}");
    }

    #[test]
    fn unknown_mnemonic_is_reported() {
        let (line, offset, message) = assemble_err("  JUMPDEST");
        assert_eq!((line, offset), (1, 3));
        assert_eq!(message, "invalid instruction name: JUMPDEST");
    }

    #[test]
    fn arity_is_checked() {
        let (_, offset, message) = assemble_err("ADD 1");
        assert_eq!(offset, 5);
        assert_eq!(message, "ADD expects 0 operand(s), got 1");

        let (_, _, message) = assemble_err("PUSH3");
        assert_eq!(message, "PUSH3 expects 1 operand(s), got 0");
    }

    #[test]
    fn assemble_file_reads_source() {
        let path = std::env::temp_dir().join(format!("stackvm-asm-{}.asm", std::process::id()));
        fs::write(&path, "PUSH1 7\nDUP1\n").unwrap();
        let code = assemble_file(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(code.as_slice(), &[0x60, 0x07, 0x80]);
    }

    #[test]
    fn tokenize_counts_columns_in_characters() {
        let tokens = tokenize("é\u{2003}PUSH1 ü");
        let texts: Vec<_> = tokens.iter().map(|t| (t.text, t.offset)).collect();
        assert_eq!(texts, vec![("é", 1), ("PUSH1", 3), ("ü", 9)]);
    }

    #[test]
    fn error_column_counts_characters() {
        let (line, offset, _) = assemble_err("PUSH1\u{2003}0xzz");
        assert_eq!((line, offset), (1, 7));
    }

    #[test]
    fn assemble_file_directory_is_io_error() {
        let dir = std::env::temp_dir();
        match assemble_file(&dir) {
            Err(VMError::IoError(message)) => {
                assert!(message.starts_with(&dir.display().to_string()), "{message}")
            }
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[test]
    fn assemble_file_invalid_utf8_is_io_error() {
        let path = std::env::temp_dir().join(format!("stackvm-utf8-{}.asm", std::process::id()));
        fs::write(&path, [b'P', 0xFF, 0xFE, b'\n']).unwrap();
        let result = assemble_file(&path);
        fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(VMError::IoError(_))), "{result:?}");
    }

    #[test]
    fn assemble_file_missing() {
        assert!(matches!(
            assemble_file("/nonexistent/stackvm/program.asm"),
            Err(VMError::IoError(_))
        ));
    }

    #[test]
    fn diagnostic_points_at_column() {
        let diag = render_assembly_diagnostic("prog.asm", "ADD\nPUSH1 999", 2, 7, "too wide");
        assert!(diag.starts_with("error: too wide\n --> prog.asm:2:7\n"));
        assert!(diag.contains("   2 | PUSH1 999"));
        assert!(diag.contains("     |       ^"));
    }

    #[test]
    fn disassemble_round_trips_well_formed_code() {
        let source = "PUSH1 0x02\nISZERO\nPUSH3 0x010203\nDUP3\nSWAP16\nPOP\nSTOP";
        let code = assemble_source(source).unwrap();
        let listing = disassemble(&code);
        assert!(listing.starts_with("PUSH1 0x02  # 0000\nISZERO  # 0002\n"));
        assert_eq!(assemble_source(&listing).unwrap(), code);
    }

    #[test]
    fn disassemble_marks_bad_bytes() {
        let listing = disassemble(&[0xFE, 0x62, 0x01]);
        assert_eq!(
            listing,
            "# 0000: invalid opcode 0xfe\n# 0001: PUSH3 truncated, operand 0x01 (1 of 3 bytes)\n"
        );
        assert!(assemble_source(&listing).unwrap().is_empty());
    }
}
